use hoist_fs::{
    BufferedCopy, BufferedCopyOptions, CopyStrategy, PlatformCopy, buffered_copy, default_strategies,
    platform_copy,
};
use tempfile::tempdir;

#[test]
fn every_default_strategy_produces_identical_bytes() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("model.gguf");
    let data: Vec<u8> = (0..(3 * 1024 * 1024 + 17)).map(|i: u32| (i % 253) as u8).collect();
    std::fs::write(&src, &data).unwrap();

    for strategy in default_strategies() {
        let dest = dir.path().join(format!("out-{}", strategy.name()));
        let copied = strategy.copy(&src, &dest).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), data, "strategy {}", strategy.name());
    }
}

#[test]
fn buffered_copy_reaches_directories_platform_copy_cannot() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("adapter.bin");
    std::fs::write(&src, b"adapter").unwrap();
    let dest = dir.path().join("models/blobs/sha256-adapter");

    assert!(PlatformCopy.copy(&src, &dest).is_err());
    BufferedCopy::default().copy(&src, &dest).unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"adapter");
}

#[test]
fn empty_file() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("empty");
    std::fs::write(&src, b"").unwrap();

    assert_eq!(platform_copy(&src, dir.path().join("a")).unwrap(), 0);
    assert_eq!(
        buffered_copy(&src, dir.path().join("b"), BufferedCopyOptions::new()).unwrap(),
        0
    );
}

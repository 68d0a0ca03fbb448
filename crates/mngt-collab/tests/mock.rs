use mngt_collab::{DeviceConfig, MockFtlDevice, SuperBlockCollaborator, TrimCollaborator};

#[test]
fn fresh_device_starts_dirty() {
    let device = MockFtlDevice::new(DeviceConfig::default());
    assert!(!device.is_clean());
    device.set_clean().unwrap();
    assert!(device.is_clean());
}

#[test]
fn unmap_reports_transient_then_succeeds() {
    let device = MockFtlDevice::new(DeviceConfig::default());
    device.seed_l2p(10, 100, false);
    device.set_unmap_transient_retries(2);

    assert!(matches!(
        device.unmap(10, 1),
        Err(mngt_collab::CollaboratorError::Transient)
    ));
    assert!(matches!(
        device.unmap(10, 1),
        Err(mngt_collab::CollaboratorError::Transient)
    ));
    assert!(device.unmap(10, 1).is_ok());
}

#[test]
fn dump_stats_counts_calls() {
    let device = MockFtlDevice::new(DeviceConfig::default());
    device.dump_stats().unwrap();
    device.dump_stats().unwrap();
    assert_eq!(device.stats_dump_count(), 2);
}

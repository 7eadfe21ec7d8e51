/// Result of a metadata-only probe for one object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found { size: i64 },
    Missing,
}

/// Existence/size probe against the blob store. Faults other than
/// "not found" travel on the error channel and abort the scan.
pub trait ObjectStatProbe {
    fn head_object(&self, key: &str) -> Result<ProbeOutcome, String>;
}

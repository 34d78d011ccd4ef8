pub mod alert_store;
pub mod supervisor_record;

pub use alert_store::{AlertStore, StoreError};
pub use supervisor_record::{PidFile, RecordError, SupervisorRecord};

#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::PathBuf;

    pub fn temp_path(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}_{}", prefix, uuid::Uuid::new_v4()))
    }
}

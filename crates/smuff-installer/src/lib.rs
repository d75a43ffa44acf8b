mod distribution;
mod fs_utils;
mod layout;
mod receipts;
mod reconcile;
mod registration;
mod types;

pub use distribution::{load_catalog, load_registration_block, remove_distribution_dir};
pub use layout::{default_dist_dir, default_home_dir, DeployConfig, RECEIPT_FILE_NAME};
pub use receipts::{read_deploy_receipt, write_deploy_receipt};
pub use reconcile::{
    apply_transition, install_artifacts, uninstall_artifacts, uninstall_artifacts_with_approval,
};
pub use registration::{ensure_registered, is_registered};
pub use types::{
    ArtifactOutcome, ArtifactReport, DeployReceipt, FragmentRecord, RegistrationOutcome, Report,
    ReportSummary, Transition,
};

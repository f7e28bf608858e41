use tracing::info;

/// Blocking interaction with the operator.
pub trait Prompter: Send + Sync {
    /// Yes/no gate in front of destructive or status-changing actions.
    fn confirm(&self, message: &str) -> bool;

    /// Show an outcome and wait for the operator to dismiss it.
    fn acknowledge(&self, message: &str);
}

/// Non-interactive prompter: confirms everything and logs outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&self, message: &str) -> bool {
        info!("{} yes (assumed)", message);
        true
    }

    fn acknowledge(&self, message: &str) {
        info!("{}", message);
    }
}

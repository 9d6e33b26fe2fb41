use crate::context::ShellContext;
use crate::hooks::{HookInstaller, HookSnapshot};
use tracing::{debug, warn};

/// Undo information for one side effect of an activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackStep {
    /// Put a variable back to its previous value, or remove it if it had none.
    RestoreVar {
        key: String,
        previous: Option<String>,
    },
    /// Restore the hook files captured before installation, skipping any
    /// that no longer hold what the installation wrote.
    RestoreHooks {
        before: HookSnapshot,
        after: HookSnapshot,
    },
}

/// In-memory record of the side effects of a running activation.
///
/// Steps are appended as effects happen. On a fatal error `rollback` replays
/// them newest first; on success the journal is simply dropped.
#[derive(Debug, Default)]
pub struct ActivationJournal {
    steps: Vec<RollbackStep>,
}

impl ActivationJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: RollbackStep) {
        self.steps.push(step);
    }

    /// Record the current value of `key` before it is changed.
    pub fn record_var(&mut self, ctx: &dyn ShellContext, key: &str) {
        self.record(RollbackStep::RestoreVar {
            key: key.to_owned(),
            previous: ctx.var(key),
        });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn rollback(self, ctx: &mut dyn ShellContext, hooks: Option<&dyn HookInstaller>) {
        debug!("rolling back {} activation step(s)", self.steps.len());
        for step in self.steps.into_iter().rev() {
            match step {
                RollbackStep::RestoreVar { key, previous } => match previous {
                    Some(value) => ctx.set_var(&key, &value),
                    None => ctx.remove_var(&key),
                },
                RollbackStep::RestoreHooks { before, after } => {
                    let Some(installer) = hooks else {
                        warn!("rollback: hook snapshot recorded without an installer");
                        continue;
                    };
                    if let Err(e) = installer.restore(&before, &after) {
                        warn!("rollback: failed to restore pre-commit hook: {e}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemoryContext;

    #[test]
    fn rollback_replays_in_reverse() {
        let mut ctx = MemoryContext::new().with_var("PATH", "/usr/bin");
        let original = ctx.clone();
        let mut journal = ActivationJournal::new();

        journal.record_var(&ctx, "PATH");
        ctx.set_var("PATH", "/a:/usr/bin");
        journal.record_var(&ctx, "PATH");
        ctx.set_var("PATH", "/b:/a:/usr/bin");
        journal.record_var(&ctx, "GOROOT");
        ctx.set_var("GOROOT", "/opt/go");
        assert_eq!(journal.len(), 3);

        journal.rollback(&mut ctx, None);
        assert_eq!(ctx, original);
    }

    #[test]
    fn rollback_removes_hooks_installed_by_the_activation() {
        use crate::hooks::{GitHookInstaller, HookEntry, HookScriptContext};

        let dir = tempfile::tempdir().unwrap();
        let installer = GitHookInstaller::with_hooks_dir(dir.path());
        let mut ctx = MemoryContext::new();
        let mut journal = ActivationJournal::new();

        let before = installer.snapshot().unwrap();
        installer
            .install(
                &[HookEntry {
                    name: "rustfmt".to_owned(),
                    command: vec!["cargo".to_owned(), "fmt".to_owned()],
                }],
                &HookScriptContext::default(),
            )
            .unwrap();
        let after = installer.snapshot().unwrap();
        journal.record(RollbackStep::RestoreHooks { before, after });

        journal.rollback(&mut ctx, Some(&installer));
        assert!(!installer.hook_path().exists());
    }

    #[test]
    fn empty_journal_is_a_no_op() {
        let mut ctx = MemoryContext::new().with_var("A", "1");
        let journal = ActivationJournal::new();
        assert!(journal.is_empty());
        journal.rollback(&mut ctx, None);
        assert_eq!(ctx.var("A").as_deref(), Some("1"));
    }
}

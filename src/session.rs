//! Session - Manages a profile session and its command loop

use crate::{
    command_result::{CommandResult, Operation},
    commands::{self, BackupCommand, Command, Commands, ListCommand, SaveCommand},
    manager::{BackupReport, ProfileManager, SaveConfig},
};

/// Mid-level: owns a profile manager for the lifetime of a session
///
/// Dropping the session refreshes every slot's backup, the same as
/// quitting the game.
pub struct Session {
    manager: ProfileManager,
    running: bool,
    backed_up: bool,
}

impl Session {
    /// Open a session, loading every slot
    pub fn open(config: SaveConfig) -> Self {
        Self::new(ProfileManager::open(config))
    }

    /// Wrap an existing manager
    pub fn new(manager: ProfileManager) -> Self {
        Self {
            manager,
            running: true,
            backed_up: false,
        }
    }

    /// Run the session with a closure that processes results
    ///
    /// The closure receives the result and should return the next command.
    /// Return None to end the session.
    pub fn run<F>(&mut self, mut handler: F)
    where
        F: FnMut(&CommandResult) -> Option<String>,
    {
        let mut result = self.list();

        while self.is_running() {
            if let Some(command) = handler(&result) {
                result = self.call(&command);
            } else {
                break;
            }
        }
    }

    /// Check if the session is still accepting commands
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn manager(&self) -> &ProfileManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ProfileManager {
        &mut self.manager
    }

    /// Execute a command line
    pub fn call(&mut self, cmd: &str) -> CommandResult {
        let command = Commands::create(cmd);
        self.execute_command(command.as_ref())
    }

    /// Summarize every slot
    pub fn list(&mut self) -> CommandResult {
        self.execute_command(&ListCommand)
    }

    /// Save the current profile
    pub fn save(&mut self, reason: &str) -> CommandResult {
        let command = SaveCommand {
            reason: reason.to_string(),
        };
        self.execute_command(&command)
    }

    /// Refresh backups now
    pub fn backup(&mut self) -> CommandResult {
        self.execute_command(&BackupCommand)
    }

    /// End the session, refreshing backups
    pub fn close(&mut self) -> BackupReport {
        self.running = false;
        self.backed_up = true;
        self.manager.backup_all()
    }

    /// Execute a command
    ///
    /// Errors become failed results so that one bad command doesn't end
    /// the session.
    fn execute_command(&mut self, command: &dyn Command) -> CommandResult {
        if !self.is_running() {
            return CommandResult::failure(command.input(), Operation::Error, "Session closed");
        }

        let result = commands::execute(command, &mut self.manager);

        if result.operation == Operation::Quit {
            self.close();
        }
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.backed_up {
            self.manager.backup_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_feeds_commands_until_quit() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::open(SaveConfig::new(tmp.path()));
        let mut script = vec!["quit", "save first", "set flag bool yes", "new 0 Ana"];
        let mut seen = Vec::new();

        session.run(|result| {
            seen.push(result.operation);
            script.pop().map(str::to_string)
        });

        assert_eq!(
            seen,
            vec![Operation::List, Operation::New, Operation::Set, Operation::Save]
        );
        assert!(!session.is_running());
        assert!(tmp.path().join("slider0-backup.cat").exists());
    }

    #[test]
    fn errors_become_failed_results() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::open(SaveConfig::new(tmp.path()));
        let result = session.call("restore 1");
        assert!(result.is_failure());
        assert_eq!(result.operation, Operation::Restore);
        assert_eq!(result.message.as_deref(), Some("No backup for slot 1"));
    }

    #[test]
    fn drop_writes_backups() {
        let tmp = TempDir::new().unwrap();
        {
            let mut session = Session::open(SaveConfig::new(tmp.path()));
            session.call("new 1 Ana");
            assert!(session.save("checkpoint").is_success());
        }
        assert!(tmp.path().join("slider1-backup.cat").exists());
    }

    #[test]
    fn closed_session_rejects_commands() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::open(SaveConfig::new(tmp.path()));
        session.close();
        assert!(session.call("list").is_failure());
    }
}

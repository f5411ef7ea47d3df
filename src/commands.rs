//! Commands - Console command implementations

use crate::{
    command_result::{CommandResult, Operation},
    manager::ProfileManager,
    profile::Area,
    store::{LocalizedString, Value},
    Result,
};
use regex::Regex;
use serde_json::json;

lazy_static::lazy_static! {
    static ref SET_PATTERN: Regex =
        Regex::new(r"(?i)^set\s+(\S+)\s+(bool|int|str|loc)\s+(.*)$").unwrap();
}

/// Parse a slot argument such as the `1` in `load 1`
fn parse_slot(parts: &[&str]) -> Option<usize> {
    parts.get(1).and_then(|s| s.parse().ok())
}

/// Parse the value part of a `set` command
fn parse_value(kind: &str, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    match kind.to_lowercase().as_str() {
        "bool" => match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        "int" => raw.parse().ok().map(Value::Int),
        "str" => Some(Value::String(raw.to_string())),
        "loc" => Some(Value::Localized(match raw.split_once('|') {
            Some((original, translated)) => {
                LocalizedString::new(original.trim(), translated.trim())
            }
            None => LocalizedString::untranslated(raw),
        })),
        _ => None,
    }
}

/// Commands factory
pub struct Commands;

impl Commands {
    /// Create a command from user input
    pub fn create(input: &str) -> Box<dyn Command> {
        let trimmed = input.trim();
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let verb = parts.first().map(|s| s.to_lowercase()).unwrap_or_default();

        let invalid = |usage: &str| -> Box<dyn Command> {
            Box::new(InvalidCommand {
                input: trimmed.to_string(),
                message: format!("Usage: {}", usage),
            })
        };

        match verb.as_str() {
            "load" => match parse_slot(&parts) {
                Some(slot) => Box::new(LoadCommand { slot }),
                None => invalid("load SLOT"),
            },
            "new" => match (parse_slot(&parts), parts.get(2)) {
                (Some(slot), Some(_)) => Box::new(NewCommand {
                    slot,
                    name: parts[2..].join(" "),
                }),
                _ => invalid("new SLOT NAME"),
            },
            "get" => match parts.get(1) {
                Some(key) => Box::new(GetCommand {
                    key: key.to_string(),
                }),
                None => invalid("get KEY"),
            },
            "set" => {
                let parsed = SET_PATTERN.captures(trimmed).and_then(|caps| {
                    parse_value(&caps[2], &caps[3]).map(|value| SetCommand {
                        key: caps[1].to_string(),
                        value,
                    })
                });
                match parsed {
                    Some(command) => Box::new(command),
                    None => invalid("set KEY bool|int|str|loc VALUE"),
                }
            }
            "area" => match parts.get(1).and_then(|s| s.parse::<Area>().ok()) {
                Some(area) => Box::new(AreaCommand { area }),
                None => invalid("area NAME"),
            },
            "save" => Box::new(SaveCommand {
                reason: parts[1..].join(" "),
            }),
            "delete" => match parse_slot(&parts) {
                Some(slot) => Box::new(DeleteCommand { slot }),
                None => invalid("delete SLOT"),
            },
            "restore" => match parse_slot(&parts) {
                Some(slot) => Box::new(RestoreCommand { slot }),
                None => invalid("restore SLOT"),
            },
            "backup" => Box::new(BackupCommand),
            "recent" => Box::new(RecentCommand),
            "list" => Box::new(ListCommand),
            "quit" | "exit" => Box::new(QuitCommand),
            _ => Box::new(InvalidCommand {
                input: trimmed.to_string(),
                message: format!("Unknown command '{}'", verb),
            }),
        }
    }
}

/// Trait for executable commands
pub trait Command {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult>;
    fn input(&self) -> String;
    fn operation(&self) -> Operation;
}

/// Run a command, turning its error into a failed result
pub fn execute(command: &dyn Command, manager: &mut ProfileManager) -> CommandResult {
    command.execute(manager).unwrap_or_else(|e| {
        CommandResult::failure(command.input(), command.operation(), e.to_string())
    })
}

/// Unparseable input
pub struct InvalidCommand {
    pub input: String,
    pub message: String,
}

impl Command for InvalidCommand {
    fn execute(&self, _manager: &mut ProfileManager) -> Result<CommandResult> {
        Ok(CommandResult::failure(&self.input, Operation::Error, &self.message))
    }

    fn input(&self) -> String {
        self.input.clone()
    }

    fn operation(&self) -> Operation {
        Operation::Error
    }
}

/// Load command - bind a slot as the current profile
pub struct LoadCommand {
    pub slot: usize,
}

impl Command for LoadCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        let area = manager.load_profile(self.slot)?;
        let name = manager.current().name.clone();

        Ok(CommandResult::success(self.input(), Operation::Load)
            .with_message(format!("[{}] Loaded {} in {}", self.slot, name, area))
            .with_detail("slot", self.slot)
            .with_detail("area", area.as_str()))
    }

    fn input(&self) -> String {
        format!("load {}", self.slot)
    }

    fn operation(&self) -> Operation {
        Operation::Load
    }
}

/// New command - start a named profile in a slot
pub struct NewCommand {
    pub slot: usize,
    pub name: String,
}

impl Command for NewCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        manager.new_profile(self.slot, &self.name)?;
        Ok(CommandResult::success(self.input(), Operation::New)
            .with_message(format!("[{}] Created profile {}", self.slot, self.name)))
    }

    fn input(&self) -> String {
        format!("new {} {}", self.slot, self.name)
    }

    fn operation(&self) -> Operation {
        Operation::New
    }
}

/// Get command - read a value from the current profile
pub struct GetCommand {
    pub key: String,
}

impl Command for GetCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        let result = CommandResult::success(self.input(), Operation::Get)
            .with_detail("key", &self.key);

        Ok(match manager.current().store.value(&self.key) {
            Some(value) => result
                .with_output(format!("{} = {}\n", self.key, value))
                .with_detail("value", value),
            None => result
                .with_success(false)
                .with_output(format!("{} is unset\n", self.key)),
        })
    }

    fn input(&self) -> String {
        format!("get {}", self.key)
    }

    fn operation(&self) -> Operation {
        Operation::Get
    }
}

/// Set command - write a value to the current profile
pub struct SetCommand {
    pub key: String,
    pub value: Value,
}

impl Command for SetCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        manager
            .current_mut()
            .store
            .insert(self.key.clone(), self.value.clone());

        Ok(CommandResult::success(self.input(), Operation::Set)
            .with_message(format!("{} = {}", self.key, self.value)))
    }

    fn input(&self) -> String {
        format!("set {} {} {}", self.key, self.value.kind(), self.value)
    }

    fn operation(&self) -> Operation {
        Operation::Set
    }
}

/// Area command - record where the player is
pub struct AreaCommand {
    pub area: Area,
}

impl Command for AreaCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        manager.current_mut().set_last_area(self.area);
        Ok(CommandResult::success(self.input(), Operation::Area)
            .with_message(format!("Now in {}", self.area)))
    }

    fn input(&self) -> String {
        format!("area {}", self.area)
    }

    fn operation(&self) -> Operation {
        Operation::Area
    }
}

/// Save command
pub struct SaveCommand {
    pub reason: String,
}

impl Command for SaveCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        let saved = manager.save(&self.reason)?;
        let result = CommandResult::success(self.input(), Operation::Save);

        Ok(match manager.current_index() {
            Some(slot) if saved => result
                .with_message(format!("[{}] Game saved successfully", slot))
                .with_detail("slot", slot)
                .with_detail("filename", manager.save_dir().filename(slot)),
            _ => result.with_message("No profile slot selected; nothing saved"),
        })
    }

    fn input(&self) -> String {
        if self.reason.is_empty() {
            "save".to_string()
        } else {
            format!("save {}", self.reason)
        }
    }

    fn operation(&self) -> Operation {
        Operation::Save
    }
}

/// Delete command
pub struct DeleteCommand {
    pub slot: usize,
}

impl Command for DeleteCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        manager.delete(self.slot)?;
        Ok(CommandResult::success(self.input(), Operation::Delete)
            .with_message(format!("[{}] Profile deleted", self.slot)))
    }

    fn input(&self) -> String {
        format!("delete {}", self.slot)
    }

    fn operation(&self) -> Operation {
        Operation::Delete
    }
}

/// Backup command - refresh every slot's backup
pub struct BackupCommand;

impl Command for BackupCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        let report = manager.backup_all();
        let mut result = CommandResult::success(self.input(), Operation::Backup)
            .with_message(format!(
                "{} written, {} up to date",
                report.written.len(),
                report.skipped.len()
            ))
            .with_detail("written", &report.written)
            .with_detail("skipped", &report.skipped);

        if !report.failed.is_empty() {
            result = result
                .with_success(false)
                .with_detail("failed", &report.failed);
        }
        Ok(result)
    }

    fn input(&self) -> String {
        "backup".to_string()
    }

    fn operation(&self) -> Operation {
        Operation::Backup
    }
}

/// Restore command - replace a slot with its backup
pub struct RestoreCommand {
    pub slot: usize,
}

impl Command for RestoreCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        manager.restore_backup(self.slot)?;
        Ok(CommandResult::success(self.input(), Operation::Restore)
            .with_message(format!("[{}] Backup restored successfully", self.slot)))
    }

    fn input(&self) -> String {
        format!("restore {}", self.slot)
    }

    fn operation(&self) -> Operation {
        Operation::Restore
    }
}

/// Recent command - find the most recently played slot
pub struct RecentCommand;

impl Command for RecentCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        let recent = manager.most_recently_played();
        let output = match recent {
            Some(slot) => format!("Most recently played: slot {}\n", slot),
            None => "No profiles\n".to_string(),
        };

        Ok(CommandResult::success(self.input(), Operation::Recent)
            .with_output(output)
            .with_detail("slot", recent))
    }

    fn input(&self) -> String {
        "recent".to_string()
    }

    fn operation(&self) -> Operation {
        Operation::Recent
    }
}

/// List command - summarize every slot
pub struct ListCommand;

impl Command for ListCommand {
    fn execute(&self, manager: &mut ProfileManager) -> Result<CommandResult> {
        let current = manager.current_index();
        let mut output = String::new();
        let mut slots = Vec::new();

        for (index, state, profile) in manager.slots() {
            let marker = if current == Some(index) { "*" } else { " " };
            match profile {
                Some(p) => {
                    output.push_str(&format!(
                        "{}{}: {:<12} {:<9} {:<6} {} values, saved {}\n",
                        marker,
                        index,
                        p.name,
                        p.last_area,
                        state,
                        p.store.len(),
                        p.last_saved.format("%Y-%m-%d %H:%M:%S"),
                    ));
                    slots.push(json!({
                        "slot": index,
                        "state": state,
                        "name": p.name,
                        "area": p.last_area.as_str(),
                        "values": p.store.len(),
                        "last_saved": p.last_saved,
                    }));
                }
                None => {
                    output.push_str(&format!("{}{}: (empty)\n", marker, index));
                    slots.push(json!({ "slot": index, "state": state }));
                }
            }
        }

        Ok(CommandResult::success(self.input(), Operation::List)
            .with_output(output)
            .with_detail("slots", slots))
    }

    fn input(&self) -> String {
        "list".to_string()
    }

    fn operation(&self) -> Operation {
        Operation::List
    }
}

/// Quit command
pub struct QuitCommand;

impl Command for QuitCommand {
    fn execute(&self, _manager: &mut ProfileManager) -> Result<CommandResult> {
        Ok(CommandResult::success(self.input(), Operation::Quit).with_message("Session ended"))
    }

    fn input(&self) -> String {
        "quit".to_string()
    }

    fn operation(&self) -> Operation {
        Operation::Quit
    }
}

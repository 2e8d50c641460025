// MIT License

use std::collections::VecDeque;

use crate::error::{ParadoxError, Result};

/// The manner of arming an area, sent to the module as a single letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    /// Arm even with open zones.
    Force,
    /// Regular (away) arm.
    Regular,
    /// Stay arm; perimeter only.
    Stay,
    /// Instant arm; stay with no entry delay.
    Instant,
}

impl ArmMode {
    /// The single-letter code the status page's arm request expects.
    pub fn code(&self) -> char {
        match self {
            ArmMode::Force => 'f',
            ArmMode::Regular => 'r',
            ArmMode::Stay => 's',
            ArmMode::Instant => 'i',
        }
    }

    /// Parse a mode name as used in MQTT commands.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "force" => Ok(ArmMode::Force),
            "regular" => Ok(ArmMode::Regular),
            "stay" => Ok(ArmMode::Stay),
            "instant" => Ok(ArmMode::Instant),
            other => Err(ParadoxError::UnknownArmMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// A pending operation for the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandItem {
    /// Fetch terminology (if needed) and scrape a fresh status snapshot.
    RefreshStatus,
    /// Arm the named area.
    ArmArea { area: String, mode: ArmMode },
    /// Keep the session alive between status refreshes.
    KeepAlive,
}

/// Discriminant used for queue de-duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    RefreshStatus,
    ArmArea,
    KeepAlive,
}

impl CommandItem {
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandItem::RefreshStatus => CommandKind::RefreshStatus,
            CommandItem::ArmArea { .. } => CommandKind::ArmArea,
            CommandItem::KeepAlive => CommandKind::KeepAlive,
        }
    }
}

/// FIFO queue of pending operations, holding at most one item per kind.
///
/// Enqueuing a kind that is already queued is a no-op — the earlier item
/// keeps both its position and its payload. Not thread-safe; the engine is
/// single-threaded cooperative and owns the queue exclusively.
#[derive(Debug, Default)]
pub struct CommandQueue {
    items: VecDeque<CommandItem>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless an item of the same kind is already queued.
    pub fn enqueue(&mut self, item: CommandItem) {
        let kind = item.kind();
        if self.items.iter().any(|i| i.kind() == kind) {
            return;
        }
        self.items.push_back(item);
    }

    /// The head item, without removing it.
    pub fn peek_front(&self) -> Option<&CommandItem> {
        self.items.front()
    }

    /// Remove and return the head item.
    pub fn pop_front(&mut self) -> Option<CommandItem> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

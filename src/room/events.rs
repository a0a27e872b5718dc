use tokio::sync::mpsc;

/// Commands delivered to a running meeting room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCommand {
    /// Leave button; a host ends the meeting instead
    Leave,
    End,
    CameraOn,
    CameraOff,
    ToggleMicrophone,
    ToggleScreenShare,
    /// External signal that the host ended the meeting
    HostEnded,
}

/// Cloneable sender half, scoped to one joined session
#[derive(Debug, Clone)]
pub struct RoomHandle {
    sender: mpsc::UnboundedSender<RoomCommand>,
}

pub type RoomCommands = mpsc::UnboundedReceiver<RoomCommand>;

pub fn channel() -> (RoomHandle, RoomCommands) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (RoomHandle { sender }, receiver)
}

impl RoomHandle {
    /// Queues a command; false once the room has shut down
    pub fn send(&self, command: RoomCommand) -> bool {
        match self.sender.send(command) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(command = ?e.0, "Room closed, command dropped");
                false
            }
        }
    }

    pub fn leave(&self) -> bool {
        self.send(RoomCommand::Leave)
    }

    pub fn end(&self) -> bool {
        self.send(RoomCommand::End)
    }

    pub fn set_camera(&self, enabled: bool) -> bool {
        self.send(if enabled {
            RoomCommand::CameraOn
        } else {
            RoomCommand::CameraOff
        })
    }

    pub fn toggle_microphone(&self) -> bool {
        self.send(RoomCommand::ToggleMicrophone)
    }

    pub fn toggle_screen_share(&self) -> bool {
        self.send(RoomCommand::ToggleScreenShare)
    }

    pub fn host_ended(&self) -> bool {
        self.send(RoomCommand::HostEnded)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

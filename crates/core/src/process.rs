use sysinfo::System;
use tracing::{debug, info, warn};

pub const EDITOR_PROCESS_NAME: &str = "WINWORD.EXE";

pub trait ProcessTerminator {
    fn kill_all(&self);
}

#[derive(Debug, Clone)]
pub struct SysinfoTerminator {
    process_name: String,
}

impl SysinfoTerminator {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }
}

impl Default for SysinfoTerminator {
    fn default() -> Self {
        Self::new(EDITOR_PROCESS_NAME)
    }
}

impl ProcessTerminator for SysinfoTerminator {
    fn kill_all(&self) {
        let mut sys = System::new();
        sys.refresh_processes();
        let mut killed = 0usize;
        for (pid, process) in sys.processes() {
            if !process.name().eq_ignore_ascii_case(&self.process_name) {
                continue;
            }
            if process.kill() {
                killed += 1;
            } else {
                warn!(%pid, name = %self.process_name, "failed to terminate process");
            }
        }
        if killed > 0 {
            info!(killed, name = %self.process_name, "terminated editor processes");
        } else {
            debug!(name = %self.process_name, "no editor process running");
        }
    }
}

impl<T: ProcessTerminator + ?Sized> ProcessTerminator for &T {
    fn kill_all(&self) {
        (**self).kill_all();
    }
}

//! Host diagnostics printed before a transfer starts

use tracing::warn;

use crate::sftp::{CancellationToken, LogLevel, TransferObserver};
use crate::ssh::SshConnection;

/// Label and command pairs, in display order
pub const SYSTEM_INFO_COMMANDS: [(&str, &str); 4] = [
    ("Uptime", "uptime -p"),
    ("Disk Usage", "df -h /"),
    ("Memory Usage", "free -h"),
    ("System Info", "uname -a"),
];

/// Run the informational commands and log their output.
///
/// Never fails: a command error is logged and the next command runs.
/// Stops early once `cancel` is set.
pub async fn fetch_system_info(
    conn: &SshConnection,
    cancel: &CancellationToken,
    observer: &dyn TransferObserver,
) {
    observer.on_log("Fetching VPS system information...", LogLevel::Info);

    for (label, command) in SYSTEM_INFO_COMMANDS {
        if cancel.is_cancelled() {
            observer.on_log(
                "Transfer terminated. Stopping system info fetch.",
                LogLevel::Warning,
            );
            return;
        }

        match conn.exec_command(command).await {
            Ok(output) => {
                let stderr = output.stderr.trim();
                if stderr.is_empty() {
                    observer.on_log(
                        &format!("{}: {}", label, output.stdout.trim()),
                        LogLevel::Info,
                    );
                } else {
                    observer.on_log(&format!("{}: Error - {}", label, stderr), LogLevel::Error);
                }
            }
            Err(e) => {
                warn!("Diagnostic command '{}' failed: {}", command, e);
                observer.on_log(&format!("{}: Error - {}", label, e), LogLevel::Error);
            }
        }
    }

    observer.on_log("System information fetched successfully.", LogLevel::Success);
}

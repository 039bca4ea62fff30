//! Best-effort detection of installed shells by checking well-known paths.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::models::ShellEntry;

use super::ShellProbe;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformProbe;

impl ShellProbe for PlatformProbe {
    fn probe(&self) -> Vec<ShellEntry> {
        let exists = |path: &Path| path.exists();
        if cfg!(windows) {
            let mut shells = detect_windows_shells(
                &exists,
                std::env::var("SystemRoot").ok().as_deref(),
                std::env::var("LOCALAPPDATA").ok().as_deref(),
            );
            shells.extend(detect_wsl_distributions());
            shells
        } else {
            detect_unix_shells(&exists)
        }
    }
}

pub(crate) fn detect_unix_shells(exists: &dyn Fn(&Path) -> bool) -> Vec<ShellEntry> {
    const COMMON: [(&str, &str); 4] = [
        ("/bin/bash", "Bash"),
        ("/bin/zsh", "Zsh"),
        ("/bin/fish", "Fish"),
        ("/bin/sh", "sh"),
    ];

    let mut shells: Vec<ShellEntry> = COMMON
        .iter()
        .filter(|(path, _)| exists(Path::new(path)))
        .map(|(path, name)| ShellEntry::new(name.to_lowercase(), *name, vec![path.to_string()]))
        .collect();

    for shell in ["bash", "zsh", "fish"] {
        let path = format!("/usr/bin/{}", shell);
        if exists(Path::new(&path)) && !shells.iter().any(|s| s.id == shell) {
            shells.push(ShellEntry::new(shell, capitalize(shell), vec![path]));
        }
    }
    shells
}

pub(crate) fn detect_windows_shells(
    exists: &dyn Fn(&Path) -> bool,
    system_root: Option<&str>,
    local_app_data: Option<&str>,
) -> Vec<ShellEntry> {
    let system32 = format!("{}\\System32", system_root.unwrap_or("C:\\Windows"));
    let mut shells = Vec::new();

    let cmd = format!("{}\\cmd.exe", system32);
    if exists(Path::new(&cmd)) {
        shells.push(ShellEntry::new("cmd", "Command Prompt", vec![cmd]));
    }

    let powershell = format!("{}\\WindowsPowerShell\\v1.0\\powershell.exe", system32);
    if exists(Path::new(&powershell)) {
        shells.push(ShellEntry::new("powershell", "Windows PowerShell", vec![powershell]));
    }

    let pwsh = [
        "C:\\Program Files\\PowerShell\\7\\pwsh.exe".to_string(),
        "C:\\Program Files\\PowerShell\\pwsh.exe".to_string(),
    ];
    if let Some(path) = first_existing(exists, &pwsh) {
        shells.push(ShellEntry::new("pwsh", "PowerShell 7", vec![path]));
    }

    let mut git_bash = vec![
        "C:\\Program Files\\Git\\bin\\bash.exe".to_string(),
        "C:\\Program Files (x86)\\Git\\bin\\bash.exe".to_string(),
    ];
    if let Some(local) = local_app_data {
        git_bash.push(format!("{}\\Programs\\Git\\bin\\bash.exe", local));
    }
    if let Some(path) = first_existing(exists, &git_bash) {
        shells.push(ShellEntry::new("gitbash", "Git Bash", vec![path]));
    }

    let cygwin = [
        "C:\\cygwin64\\bin\\bash.exe".to_string(),
        "C:\\cygwin\\bin\\bash.exe".to_string(),
    ];
    if let Some(path) = first_existing(exists, &cygwin) {
        shells.push(ShellEntry::new(
            "cygwin",
            "Cygwin Bash",
            vec![path, "--login".to_string(), "-i".to_string()],
        ));
    }

    shells
}

fn detect_wsl_distributions() -> Vec<ShellEntry> {
    let output = match Command::new("wsl.exe").args(["--list", "--quiet"]).output() {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "wsl.exe not available");
            return Vec::new();
        }
    };
    if !output.status.success() {
        return Vec::new();
    }
    wsl_entries(&String::from_utf8_lossy(&output.stdout))
}

/// `wsl --list --quiet` prints UTF-16, which shows up here as NUL-padded text.
pub(crate) fn parse_wsl_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.replace('\0', "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

pub(crate) fn wsl_entries(output: &str) -> Vec<ShellEntry> {
    let distros = parse_wsl_list(output);
    if distros.is_empty() {
        return Vec::new();
    }

    let mut shells = vec![ShellEntry::new("wsl", "WSL (Default)", vec!["wsl.exe".to_string()])];
    for distro in distros {
        shells.push(ShellEntry::new(
            format!("wsl-{}", distro),
            format!("WSL: {}", distro),
            vec!["wsl.exe".to_string(), "-d".to_string(), distro],
        ));
    }
    shells
}

fn first_existing(exists: &dyn Fn(&Path) -> bool, candidates: &[String]) -> Option<String> {
    candidates.iter().find(|p| exists(Path::new(p.as_str()))).cloned()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(paths: &'static [&'static str]) -> impl Fn(&Path) -> bool {
        move |path: &Path| paths.iter().any(|p| Path::new(p) == path)
    }

    #[test]
    fn unix_prefers_bin_and_fills_gaps_from_usr_bin() {
        let exists = only(&["/bin/bash", "/usr/bin/bash", "/usr/bin/fish"]);

        let shells = detect_unix_shells(&exists);

        let ids: Vec<_> = shells.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["bash", "fish"]);
        assert_eq!(shells[0].launch_command, vec!["/bin/bash"]);
        assert_eq!(shells[1].display_name, "Fish");
        assert_eq!(shells[1].launch_command, vec!["/usr/bin/fish"]);
    }

    #[test]
    fn windows_picks_first_existing_candidate() {
        let exists = only(&[
            "D:\\Win\\System32\\cmd.exe",
            "C:\\Program Files\\PowerShell\\pwsh.exe",
            "C:\\Users\\me\\AppData\\Local\\Programs\\Git\\bin\\bash.exe",
            "C:\\cygwin\\bin\\bash.exe",
        ]);

        let shells = detect_windows_shells(&exists, Some("D:\\Win"), Some("C:\\Users\\me\\AppData\\Local"));

        let ids: Vec<_> = shells.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["cmd", "pwsh", "gitbash", "cygwin"]);
        assert_eq!(shells[2].launch_command, vec!["C:\\Users\\me\\AppData\\Local\\Programs\\Git\\bin\\bash.exe"]);
        assert_eq!(shells[3].launch_command[1..], ["--login", "-i"]);
    }

    #[test]
    fn wsl_list_strips_utf16_padding() {
        let raw = "U\0b\0u\0n\0t\0u\0\r\n\0D\0e\0b\0i\0a\0n\0\r\n\0\r\n";

        assert_eq!(parse_wsl_list(raw), vec!["Ubuntu", "Debian"]);
    }

    #[test]
    fn wsl_entries_include_default_and_each_distro() {
        let shells = wsl_entries("Ubuntu\n");

        assert_eq!(shells[0].id, "wsl");
        assert_eq!(shells[1].id, "wsl-Ubuntu");
        assert_eq!(shells[1].display_name, "WSL: Ubuntu");
        assert_eq!(shells[1].launch_command, vec!["wsl.exe", "-d", "Ubuntu"]);
        assert!(wsl_entries("\n \n").is_empty());
    }
}

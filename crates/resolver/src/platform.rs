//! Maps the running process's OS/CPU to npm's naming and applies the
//! block/allow-list semantics npm's `os`/`cpu` manifest fields use.

/// The current process's OS, in npm's naming (`darwin`, `win32`, `linux`, …).
pub fn current_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// The current process's CPU architecture, in npm's naming (`x64`, `arm64`, …).
pub fn current_cpu() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Applies npm's block/allow-list semantics: an entry prefixed with `!`
/// excludes that identifier; any entries *without* the prefix make the list
/// an allow-list (the current identifier must be among them). A block entry
/// always wins over an allow entry for the same identifier. `None` (the
/// field is absent) means "no restriction".
pub fn matches_platform(list: Option<&[String]>, current: &str) -> bool {
    let Some(list) = list else { return true };
    if list.iter().any(|entry| entry.strip_prefix('!').is_some_and(|blocked| blocked == current)) {
        return false;
    }
    let has_allow_list = list.iter().any(|entry| !entry.starts_with('!'));
    if !has_allow_list {
        return true;
    }
    list.iter().any(|entry| entry == current)
}

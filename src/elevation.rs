//! Startup privilege check and elevated relaunch
//!
//! Silent installs need administrator rights. The deployment task normally
//! grants them; when it does not, the agent relaunches itself elevated and
//! the unprivileged instance exits.

/// Check if the current process has administrator privileges.
///
/// Returns true if running with elevated privileges, false otherwise.
#[cfg(windows)]
pub fn is_administrator() -> bool {
    unsafe {
        use windows::Win32::Security::{
            GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
        };
        use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};
        use windows::Win32::Foundation::CloseHandle;

        let mut token_handle = windows::Win32::Foundation::HANDLE::default();

        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token_handle).is_err() {
            return false;
        }

        let mut elevation = TOKEN_ELEVATION::default();
        let mut return_length: u32 = 0;

        let result = GetTokenInformation(
            token_handle,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut std::ffi::c_void),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut return_length,
        );

        let _ = CloseHandle(token_handle);

        if result.is_ok() {
            elevation.TokenIsElevated != 0
        } else {
            false
        }
    }
}

/// Check if the current process has root privileges
#[cfg(unix)]
pub fn is_administrator() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Relaunch the current executable with administrator privileges via the
/// UAC prompt. The current process should exit after a successful relaunch.
#[cfg(windows)]
pub fn relaunch_elevated() -> std::io::Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use windows::core::{w, PCWSTR};
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::Win32::UI::WindowsAndMessaging::SW_HIDE;

    let exe_path = std::env::current_exe()?;
    log::info!("Relaunching elevated: {}", exe_path.display());

    let mut exe_wide: Vec<u16> = exe_path.as_os_str().encode_wide().collect();
    exe_wide.push(0);

    let result = unsafe {
        ShellExecuteW(
            None,
            w!("runas"),
            PCWSTR(exe_wide.as_ptr()),
            PCWSTR::null(),
            PCWSTR::null(),
            SW_HIDE,
        )
    };

    // ShellExecuteW reports success with a value greater than 32
    if result.0 as usize > 32 {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("ShellExecuteW returned {}", result.0 as usize),
        ))
    }
}

/// Relaunch the current process with administrator privileges using osascript.
///
/// Uses AppleScript `do shell script ... with administrator privileges` to
/// trigger the macOS authorization dialog. The current process should exit
/// after calling this.
#[cfg(target_os = "macos")]
pub fn relaunch_elevated() -> std::io::Result<()> {
    use std::process::Command;

    let exe_path = std::env::current_exe()?;
    let exe_path_str = exe_path.to_string_lossy();

    log::info!("Relaunching elevated: {}", exe_path_str);

    let script = format!(
        "do shell script \"'{}'\" with administrator privileges",
        exe_path_str.replace('\'', "'\\''")
    );

    match Command::new("osascript").args(["-e", &script]).spawn() {
        Ok(_) => Ok(()),
        Err(e) => Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("Failed to elevate: {}", e),
        )),
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
pub fn relaunch_elevated() -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "elevated relaunch is not supported on this platform",
    ))
}

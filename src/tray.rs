//! System tray integration for the update agent
//!
//! Lets the agent run in the background with a tray icon exposing a manual
//! update check and an exit action.

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

/// System tray with the agent's two actions
pub struct AgentTray {
    _tray_icon: TrayIcon,
    check_now: Arc<AtomicBool>,
    quit_requested: Arc<AtomicBool>,
}

impl AgentTray {
    /// Create and initialize the system tray
    pub fn new() -> Result<Self, String> {
        let check_item = MenuItem::new("Check for Updates Now", true, None);
        let separator = PredefinedMenuItem::separator();
        let exit_item = MenuItem::new("Exit", true, None);

        let menu = Menu::new();
        menu.append(&check_item).map_err(|e| e.to_string())?;
        menu.append(&separator).map_err(|e| e.to_string())?;
        menu.append(&exit_item).map_err(|e| e.to_string())?;

        let icon = default_icon()?;

        let tray_icon = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("SwiftTunnel Update Agent")
            .with_icon(icon)
            .build()
            .map_err(|e| format!("Failed to create tray icon: {}", e))?;

        let check_now = Arc::new(AtomicBool::new(false));
        let quit_requested = Arc::new(AtomicBool::new(false));

        let check_clone = Arc::clone(&check_now);
        let quit_clone = Arc::clone(&quit_requested);
        let check_id = check_item.id().clone();
        let exit_id = exit_item.id().clone();

        // Drain menu events on a dedicated thread; the main loop polls the
        // flags.
        std::thread::spawn(move || {
            let receiver = MenuEvent::receiver();
            loop {
                if let Ok(event) = receiver.recv() {
                    if event.id == check_id {
                        info!("Tray: manual update check requested");
                        check_clone.store(true, Ordering::SeqCst);
                    } else if event.id == exit_id {
                        info!("Tray: exit requested");
                        quit_clone.store(true, Ordering::SeqCst);
                    }
                }
            }
        });

        info!("System tray initialized");

        Ok(Self {
            _tray_icon: tray_icon,
            check_now,
            quit_requested,
        })
    }

    /// Check if a manual update check was requested and reset the flag
    pub fn take_check_now(&self) -> bool {
        self.check_now.swap(false, Ordering::SeqCst)
    }

    /// Check if exit was requested
    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::SeqCst)
    }
}

/// Drain pending window messages so the tray icon and its menu stay
/// responsive on the polling thread.
pub fn pump_messages() {
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    };

    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Create a simple default icon (SwiftTunnel blue square)
fn default_icon() -> Result<Icon, String> {
    let size = 16u32;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for _ in 0..size * size {
        // SwiftTunnel blue: #3b82f6
        rgba.extend_from_slice(&[59, 130, 246, 255]);
    }
    Icon::from_rgba(rgba, size, size).map_err(|e| format!("Failed to create icon: {}", e))
}

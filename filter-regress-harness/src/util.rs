//! Utility functions for the harness.

use crate::config::Arch;

/// Gets the normalized architecture of the running system.
///
/// On Unix this consults `uname(2)`, so a 32-bit userland on a 64-bit kernel
/// still reports the kernel's machine name.
pub fn get_host_arch() -> Arch {
    #[cfg(unix)]
    {
        let uts = nix::sys::utsname::uname();
        if let Ok(uts) = uts {
            return Arch::from_machine(&uts.machine().to_string_lossy());
        }
    }

    Arch::from_machine(std::env::consts::ARCH)
}

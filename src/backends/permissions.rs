// SPDX-License-Identifier: GPL-3.0-only

//! Access checks for the camera and picture storage
//!
//! On Linux a "permission grant" is simply whether the current user may open
//! the device node or read the pictures directory (usually membership of
//! the `video` group for cameras).

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resources the scanner needs access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read/write access to the camera device
    Camera,
    /// Read access to picked photos
    Storage,
}

/// Answer from a permission authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Grants or denies access to resources
pub trait PermissionAuthority: Send + Sync {
    fn check(&self, permission: Permission) -> PermissionStatus;
}

/// Permission checks backed by filesystem access on the actual nodes
#[derive(Debug, Clone)]
pub struct DevicePermissions {
    camera_node: Option<PathBuf>,
    storage_root: Option<PathBuf>,
}

impl DevicePermissions {
    pub fn new(camera_node: Option<PathBuf>, storage_root: Option<PathBuf>) -> Self {
        Self {
            camera_node,
            storage_root,
        }
    }

    pub fn for_camera(camera_node: impl Into<PathBuf>) -> Self {
        Self::new(Some(camera_node.into()), None)
    }

    pub fn for_storage(storage_root: impl Into<PathBuf>) -> Self {
        Self::new(None, Some(storage_root.into()))
    }
}

impl PermissionAuthority for DevicePermissions {
    fn check(&self, permission: Permission) -> PermissionStatus {
        let (path, mode) = match permission {
            Permission::Camera => (self.camera_node.as_deref(), libc::R_OK | libc::W_OK),
            Permission::Storage => (self.storage_root.as_deref(), libc::R_OK),
        };

        // Nothing configured to check against; let the pipeline report errors
        let Some(path) = path else {
            return PermissionStatus::Granted;
        };

        let status = check_access(path, mode);
        debug!(?permission, path = %path.display(), ?status, "Checked access");
        status
    }
}

/// Check access with `access(2)`
///
/// Only EACCES/EPERM count as a denial; a missing node is left for the
/// capture source to report as unavailable.
fn check_access(path: &Path, mode: libc::c_int) -> PermissionStatus {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        warn!(path = %path.display(), "Path contains NUL byte");
        return PermissionStatus::Denied;
    };

    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    let result = unsafe { libc::access(c_path.as_ptr(), mode) };
    if result == 0 {
        return PermissionStatus::Granted;
    }

    match std::io::Error::last_os_error().raw_os_error() {
        Some(libc::EACCES) | Some(libc::EPERM) | Some(libc::EROFS) => PermissionStatus::Denied,
        _ => PermissionStatus::Granted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_permissions_are_granted() {
        let permissions = DevicePermissions::new(None, None);
        assert_eq!(
            permissions.check(Permission::Camera),
            PermissionStatus::Granted
        );
        assert_eq!(
            permissions.check(Permission::Storage),
            PermissionStatus::Granted
        );
    }

    #[test]
    fn test_readable_directory_grants_storage() {
        let dir = tempfile::tempdir().unwrap();
        let permissions = DevicePermissions::for_storage(dir.path());
        assert_eq!(
            permissions.check(Permission::Storage),
            PermissionStatus::Granted
        );
    }

    #[test]
    fn test_missing_node_is_not_a_denial() {
        let permissions = DevicePermissions::for_camera("/dev/video-does-not-exist");
        assert_eq!(
            permissions.check(Permission::Camera),
            PermissionStatus::Granted
        );
    }
}

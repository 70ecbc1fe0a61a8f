// SPDX-License-Identifier: GPL-3.0-only

//! Platform backends: camera capture and access checks

pub mod camera;
pub mod permissions;

// SPDX-License-Identifier: GPL-3.0-only

//! Device catalog
//!
//! Discovers video inputs and sorts them into back-main, back-wide and front
//! buckets. Platforms do not report a lens role, so classification works
//! from the human-readable label, falling back to comparing optical zoom
//! ranges when two rear cameras cannot be told apart by name. Both are
//! heuristics and vendor naming varies; treat the result as best-effort.

use super::state::{CameraDevice, CameraMode, LensRole};
use crate::backends::camera::types::{
    AcquireError, DeviceKind, FacingMode, MediaDeviceInfo, PermissionStatus, PlatformError,
    StreamConstraints,
};
use crate::backends::camera::{CameraPlatform, CaptureStream};
use crate::constants::labels;
use crate::errors::SessionError;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Classify a device label. `None` for blank labels.
///
/// Rear tokens win, so "Surface Camera Rear" stays a rear camera despite
/// containing "face". Any label with neither rear nor front tokens is also
/// treated as rear. Rear cameras split into wide and main by lens tokens.
pub fn classify_label(label: &str) -> Option<LensRole> {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        return None;
    }

    let contains_any = |tokens: &[&str]| tokens.iter().any(|t| label.contains(t));

    if !contains_any(labels::BACK) && contains_any(labels::FRONT) {
        return Some(LensRole::Front);
    }

    if contains_any(labels::WIDE) {
        Some(LensRole::BackWide)
    } else {
        Some(LensRole::BackMain)
    }
}

/// Classified device list with per-role picks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    pub devices: Vec<CameraDevice>,
    pub back_main: Option<String>,
    pub back_wide: Option<String>,
    pub front: Option<String>,
    /// Initial selection: back-main, else back-wide, else first device
    pub recommended: Option<String>,
}

impl CatalogSnapshot {
    /// Build buckets from already-classified devices
    pub fn from_devices(devices: Vec<CameraDevice>) -> Self {
        let first_with = |role: LensRole| {
            devices
                .iter()
                .find(|d| d.role == Some(role))
                .map(|d| d.id.clone())
        };
        let back_main = first_with(LensRole::BackMain);
        let back_wide = first_with(LensRole::BackWide);
        let front = first_with(LensRole::Front);
        let recommended = back_main
            .clone()
            .or_else(|| back_wide.clone())
            .or_else(|| devices.first().map(|d| d.id.clone()));

        Self {
            devices,
            back_main,
            back_wide,
            front,
            recommended,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device to open for `mode`, if any bucket fits
    pub fn device_for_mode(&self, mode: CameraMode) -> Option<&str> {
        let pick = match mode {
            CameraMode::BackMain => self.back_main.as_ref().or(self.back_wide.as_ref()),
            CameraMode::BackWide => self.back_wide.as_ref().or(self.back_main.as_ref()),
            CameraMode::Front => self.front.as_ref(),
            CameraMode::Auto => self.recommended.as_ref(),
        };
        pick.map(String::as_str)
    }

    pub fn role_of(&self, device_id: &str) -> Option<LensRole> {
        self.devices
            .iter()
            .find(|d| d.id == device_id)
            .and_then(|d| d.role)
    }
}

/// Result of a successful discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub catalog: CatalogSnapshot,
    pub permission: PermissionStatus,
}

/// Failed discovery, with the permission state observed on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryError {
    pub error: SessionError,
    pub permission: PermissionStatus,
}

impl DiscoveryError {
    fn new(error: SessionError, permission: PermissionStatus) -> Self {
        Self { error, permission }
    }
}

/// Classify raw enumeration entries, numbering blank labels for display
pub fn classify_devices(entries: &[MediaDeviceInfo]) -> Vec<CameraDevice> {
    entries
        .iter()
        .filter(|e| e.kind == DeviceKind::VideoInput)
        .enumerate()
        .map(|(index, entry)| {
            let label = entry.label.trim();
            CameraDevice {
                id: entry.id.clone(),
                label: if label.is_empty() {
                    format!("Camera {}", index + 1)
                } else {
                    label.to_string()
                },
                role: classify_label(label),
            }
        })
        .collect()
}

/// Ids of rear cameras the label pass could not tell apart
///
/// Only ambiguous when there are several main-classified cameras and no
/// camera was explicitly marked wide.
fn ambiguous_rear_candidates(devices: &[CameraDevice]) -> Vec<String> {
    if devices.iter().any(|d| d.role == Some(LensRole::BackWide)) {
        return Vec::new();
    }
    let mains: Vec<String> = devices
        .iter()
        .filter(|d| d.role == Some(LensRole::BackMain))
        .map(|d| d.id.clone())
        .collect();
    if mains.len() < 2 { Vec::new() } else { mains }
}

/// Assign wide/main among `zooms` (device id, max zoom).
///
/// Smallest max zoom becomes wide, largest becomes main. Returns `None` when
/// the probe gave nothing usable to compare.
pub fn pick_by_zoom(zooms: &[(String, f64)]) -> Option<(String, String)> {
    if zooms.len() < 2 {
        return None;
    }
    let wide = zooms
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))?;
    let main = zooms
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    if wide.1 == main.1 {
        return None;
    }
    Some((wide.0.clone(), main.0.clone()))
}

/// Open each candidate briefly and read its maximum optical zoom
async fn probe_max_zoom<P: CameraPlatform>(platform: &P, candidates: &[String]) -> Vec<(String, f64)> {
    let mut zooms = Vec::new();
    for id in candidates {
        match platform.acquire(&StreamConstraints::exact_device(id.clone())).await {
            Ok(stream) => {
                let caps = stream.capabilities().await;
                stream.stop_tracks();
                match caps.and_then(|c| c.zoom).filter(|range| range.is_valid()) {
                    Some(range) => {
                        debug!(device = %id, max_zoom = range.max, "Probed zoom range");
                        zooms.push((id.clone(), range.max));
                    }
                    None => debug!(device = %id, "No usable zoom range reported"),
                }
            }
            Err(e) => debug!(device = %id, error = %e, "Zoom probe could not open device"),
        }
    }
    zooms
}

/// Run a throwaway acquisition and release it immediately
async fn prime<P: CameraPlatform>(
    platform: &P,
    constraints: StreamConstraints,
) -> Result<(), AcquireError> {
    let stream = platform.acquire(&constraints).await?;
    stream.stop_tracks();
    Ok(())
}

async fn list_video_inputs<P: CameraPlatform>(
    platform: &P,
    permission: PermissionStatus,
) -> Result<Vec<MediaDeviceInfo>, DiscoveryError> {
    match platform.enumerate_devices().await {
        Ok(entries) => Ok(entries
            .into_iter()
            .filter(|e| e.kind == DeviceKind::VideoInput)
            .collect()),
        Err(PlatformError::NotSupported(_)) => Err(DiscoveryError::new(
            SessionError::UnsupportedEnvironment,
            permission,
        )),
        Err(e) => {
            warn!(error = %e, "Device enumeration failed");
            Ok(Vec::new())
        }
    }
}

/// Discover and classify cameras
pub async fn discover<P: CameraPlatform>(platform: &P) -> Result<Discovery, DiscoveryError> {
    if !platform.has_media_devices() {
        warn!("No media device API available");
        return Err(DiscoveryError::new(
            SessionError::UnsupportedEnvironment,
            PermissionStatus::Unknown,
        ));
    }

    let mut permission = platform
        .query_permission()
        .await
        .unwrap_or(PermissionStatus::Unknown);
    if permission == PermissionStatus::Denied {
        info!("Camera permission denied, skipping discovery");
        return Err(DiscoveryError::new(SessionError::PermissionDenied, permission));
    }

    // Labels stay blank on most platforms until a stream has been opened once
    match prime(platform, StreamConstraints::any_video()).await {
        Ok(()) => permission = PermissionStatus::Granted,
        Err(AcquireError::NotAllowed(msg)) => {
            info!(reason = %msg, "Permission prompt rejected");
            return Err(DiscoveryError::new(
                SessionError::PermissionDenied,
                PermissionStatus::Denied,
            ));
        }
        Err(e) => debug!(error = %e, "Permission priming failed, continuing"),
    }

    let mut entries = list_video_inputs(platform, permission).await?;

    if entries.is_empty() {
        debug!("No video inputs listed, forcing a permission prompt");
        match prime(platform, StreamConstraints::facing(FacingMode::Environment)).await {
            Ok(()) => permission = PermissionStatus::Granted,
            Err(AcquireError::NotAllowed(_)) => {
                return Err(DiscoveryError::new(
                    SessionError::PermissionDenied,
                    PermissionStatus::Denied,
                ));
            }
            Err(e) => debug!(error = %e, "Forced prompt acquisition failed"),
        }
        entries = list_video_inputs(platform, permission).await?;
    }

    if entries.is_empty() {
        warn!("No cameras found");
        return Err(DiscoveryError::new(SessionError::NoCameraFound, permission));
    }

    let mut devices = classify_devices(&entries);

    let candidates = ambiguous_rear_candidates(&devices);
    if !candidates.is_empty() {
        debug!(count = candidates.len(), "Rear cameras ambiguous by label, probing zoom");
        let zooms = probe_max_zoom(platform, &candidates).await;
        if let Some((wide, main)) = pick_by_zoom(&zooms) {
            info!(wide = %wide, main = %main, "Assigned rear lenses by zoom range");
            for device in devices.iter_mut() {
                if device.id == wide {
                    device.role = Some(LensRole::BackWide);
                } else if device.id == main {
                    device.role = Some(LensRole::BackMain);
                }
            }
        }
    }

    let catalog = CatalogSnapshot::from_devices(devices);
    info!(
        count = catalog.devices.len(),
        back_main = ?catalog.back_main,
        back_wide = ?catalog.back_wide,
        front = ?catalog.front,
        "Camera discovery complete"
    );

    Ok(Discovery {
        catalog,
        permission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, label: &str) -> MediaDeviceInfo {
        MediaDeviceInfo::video(id, label)
    }

    #[test]
    fn test_three_lens_phone_labels() {
        let devices = classify_devices(&[
            video("a", "Back Camera"),
            video("b", "Back Ultra Wide Camera"),
            video("c", "Front Camera"),
        ]);
        let catalog = CatalogSnapshot::from_devices(devices);
        assert_eq!(catalog.back_main.as_deref(), Some("a"));
        assert_eq!(catalog.back_wide.as_deref(), Some("b"));
        assert_eq!(catalog.front.as_deref(), Some("c"));
        assert_eq!(catalog.recommended.as_deref(), Some("a"));
    }

    #[test]
    fn test_label_tokens() {
        assert_eq!(classify_label("camera2 0, facing back"), Some(LensRole::BackMain));
        assert_eq!(classify_label("camera2 1, facing front"), Some(LensRole::Front));
        assert_eq!(classify_label("REAR WIDE"), Some(LensRole::BackWide));
        assert_eq!(classify_label("Environment 0.5x"), Some(LensRole::BackWide));
        assert_eq!(classify_label("FaceTime HD Camera"), Some(LensRole::Front));
        assert_eq!(classify_label("User Facing"), Some(LensRole::Front));
        assert_eq!(classify_label(""), None);
        assert_eq!(classify_label("   "), None);
    }

    #[test]
    fn test_unmarked_label_biases_to_back() {
        assert_eq!(classify_label("Integrated Webcam"), Some(LensRole::BackMain));
        assert_eq!(classify_label("Surface Camera Rear"), Some(LensRole::BackMain));
        assert_eq!(classify_label("Surface Camera Front"), Some(LensRole::Front));
    }

    #[test]
    fn test_blank_labels_are_numbered() {
        let devices = classify_devices(&[
            video("x", ""),
            MediaDeviceInfo {
                kind: DeviceKind::AudioInput,
                id: "mic".into(),
                label: "Microphone".into(),
            },
            video("y", ""),
        ]);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].label, "Camera 1");
        assert_eq!(devices[1].label, "Camera 2");
        assert!(devices.iter().all(|d| d.role.is_none()));

        let catalog = CatalogSnapshot::from_devices(devices);
        assert_eq!(catalog.recommended.as_deref(), Some("x"));
    }

    #[test]
    fn test_ambiguity_detection() {
        let two_mains = classify_devices(&[video("a", "Back Camera"), video("b", "Back Camera 2")]);
        assert_eq!(ambiguous_rear_candidates(&two_mains), vec!["a", "b"]);

        let marked = classify_devices(&[video("a", "Back Camera"), video("b", "Back Wide")]);
        assert!(ambiguous_rear_candidates(&marked).is_empty());
    }

    // Best-effort: lower max zoom is assumed to be the wide lens
    #[test]
    fn test_pick_by_zoom_prefers_smaller_max_for_wide() {
        let zooms = vec![("a".to_string(), 10.0), ("b".to_string(), 2.0)];
        assert_eq!(
            pick_by_zoom(&zooms),
            Some(("b".to_string(), "a".to_string()))
        );
        assert_eq!(pick_by_zoom(&zooms[..1]), None);
        assert_eq!(
            pick_by_zoom(&[("a".to_string(), 4.0), ("b".to_string(), 4.0)]),
            None
        );
    }

    #[test]
    fn test_mode_fallbacks() {
        let catalog = CatalogSnapshot::from_devices(classify_devices(&[video("a", "Back Camera")]));
        assert_eq!(catalog.device_for_mode(CameraMode::BackWide), Some("a"));
        assert_eq!(catalog.device_for_mode(CameraMode::Front), None);
        assert_eq!(catalog.device_for_mode(CameraMode::Auto), Some("a"));
    }
}

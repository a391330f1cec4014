/// Supported volume kinds
///
/// Forces lowercase values of this enum to be used
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum VolumeKind {
    /// Named volume managed by the container runtime
    Volume,
    /// Bind mount from a user scoped path
    Bind,
}
impl Default for VolumeKind {
    fn default() -> VolumeKind {
        VolumeKind::Volume
    }
}

/// Volume attached to a service container
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VolumeSpec {
    /// Volume name (named volumes) or directory name (bind mounts)
    pub name: String,
    /// Where the volume is mounted inside the container
    pub mount_path: String,
    /// SELinux relabel flag
    #[serde(default = "selinux_label_default")]
    pub selinux_label: String,
    /// Volume kind
    #[serde(default, rename = "type")]
    pub kind: VolumeKind,
}
fn selinux_label_default() -> String {
    "Z".into()
}

impl VolumeSpec {
    /// Mount argument as rendered into the container unit
    ///
    /// Bind mounts are sourced from the user container config directory.
    pub fn mount_arg(&self) -> String {
        match self.kind {
            VolumeKind::Volume => format!("{}:{}:{}", self.name, self.mount_path, self.selinux_label),
            VolumeKind::Bind => format!(
                "%h/.config/containers/{}:{}:{}",
                self.name, self.mount_path, self.selinux_label
            ),
        }
    }
}

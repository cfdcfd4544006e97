/// Display name of an application derived from its executable path.
///
/// Bundles under `/Applications` and installs under `Program Files` are named after their
/// directory; anything else after its file name without `.exe`. Both separators are accepted so
/// logs from either platform resolve the same way.
pub fn app_name_from_path(path: &str) -> Option<String> {
    let components: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|v| !v.is_empty())
        .collect();

    let install_root = components
        .iter()
        .position(|v| matches!(*v, "Applications" | "Program Files" | "Program Files (x86)"));

    if let Some(root) = install_root {
        // Only the first component (or the one after a drive letter) counts as an install root.
        if root == 0 || (root == 1 && components[0].ends_with(':')) {
            let name = components.get(root + 1)?;
            return Some(name.trim_end_matches(".app").to_string());
        }
    }

    components
        .last()
        .map(|v| v.trim_end_matches(".exe").to_string())
}

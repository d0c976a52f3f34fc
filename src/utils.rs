use std::path::Path;

/// Format byte count as human-readable string.
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.2} KB", bytes as f64 / 1_024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Shorten a path for display by replacing home dir with ~.
pub fn display_path(path: &Path) -> String {
    match dirs::home_dir() {
        Some(home) => shorten_home(path, &home),
        None => path.display().to_string(),
    }
}

fn shorten_home(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(relative) if relative.as_os_str().is_empty() => "~".to_string(),
        Ok(relative) => format!("~/{}", relative.display()),
        Err(_) => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(11), "11 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1_048_576), "5.00 MB");
        assert_eq!(format_size(3 * 1_073_741_824), "3.00 GB");
    }

    #[test]
    fn home_is_shortened() {
        let home = Path::new("/home/op");
        assert_eq!(shorten_home(Path::new("/home/op/a/b.txt"), home), "~/a/b.txt");
        assert_eq!(shorten_home(home, home), "~");
        assert_eq!(shorten_home(Path::new("/tmp/x"), home), "/tmp/x");
        assert_eq!(shorten_home(Path::new("rel/x"), home), "rel/x");
    }
}

fn main() {
    // Embed the window icon and manifest into Windows builds when present
    #[cfg(target_os = "windows")]
    {
        let mut res = winres::WindowsResource::new();
        let mut embedded = false;

        if std::path::Path::new("assets/app.manifest").exists() {
            res.set_manifest_file("assets/app.manifest");
            embedded = true;
        }
        if std::path::Path::new("assets/icon.ico").exists() {
            res.set_icon("assets/icon.ico");
            embedded = true;
        }

        if embedded {
            if let Err(e) = res.compile() {
                eprintln!("Warning: Failed to embed manifest/icon: {}", e);
            }
        }
    }
}

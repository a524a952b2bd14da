//! Installer behaviour against a local HTTP server.

use std::io::Write;
use std::sync::{Arc, Mutex};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ytclip_resources::{
    ArchiveDownload, ArchiveEntry, BinaryDownload, Installer, ProgressReporter, Resource,
    ResourceError, ResourceVerifier, ToolVerifier,
};

// sha256("hello")
const HELLO_SHA: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

async fn serve(route: &str, status: u16, body: Vec<u8>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}

fn recording() -> (ProgressReporter, Arc<Mutex<Vec<(String, f64)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let reporter = ProgressReporter::new(move |desc, pct| {
        sink.lock().unwrap().push((desc.to_string(), pct));
    });
    (reporter, seen)
}

#[tokio::test]
async fn binary_download_installs_verified_file() {
    let server = serve("/yt-dlp", 200, b"hello".to_vec()).await;
    let dir = tempfile::tempdir().unwrap();
    let installer = BinaryDownload::new(reqwest::Client::new(), format!("{}/yt-dlp", server.uri()))
        .with_sha256(HELLO_SHA.to_uppercase());
    let resource = Resource::new(
        "yt-dlp",
        "yt-dlp",
        dir.path().join("bin").join("yt-dlp"),
        Arc::new(installer.clone()),
    );

    let (reporter, seen) = recording();
    installer.install(&resource, &reporter).await.unwrap();

    assert_eq!(std::fs::read(&resource.expected_path).unwrap(), b"hello");
    assert!(!dir.path().join("bin").join("yt-dlp.part").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&resource.expected_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    let seen = seen.lock().unwrap();
    assert!(seen.iter().any(|(d, _)| d == "Downloading"));
    assert_eq!(seen.last().unwrap().1, 100.0);
    assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1), "progress went backwards: {seen:?}");
}

#[tokio::test]
async fn binary_download_rejects_bad_checksum() {
    let server = serve("/yt-dlp", 200, b"tampered".to_vec()).await;
    let dir = tempfile::tempdir().unwrap();
    let installer = BinaryDownload::new(reqwest::Client::new(), format!("{}/yt-dlp", server.uri()))
        .with_sha256(HELLO_SHA);
    let resource = Resource::new("yt-dlp", "yt-dlp", dir.path().join("yt-dlp"), Arc::new(installer.clone()));

    let err = installer
        .install(&resource, &ProgressReporter::noop())
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::ChecksumMismatch { .. }));
    assert!(!resource.expected_path.exists());
    assert!(!dir.path().join("yt-dlp.part").exists());
}

#[tokio::test]
async fn binary_download_http_error_is_network_error() {
    let server = serve("/yt-dlp", 404, Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let installer = BinaryDownload::new(reqwest::Client::new(), format!("{}/yt-dlp", server.uri()));
    let resource = Resource::new("yt-dlp", "yt-dlp", dir.path().join("yt-dlp"), Arc::new(installer.clone()));

    let err = installer
        .install(&resource, &ProgressReporter::noop())
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::NetworkError(msg) if msg.contains("404")));
}

fn ffmpeg_zip() -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in [
            ("ffmpeg-N-1-win64-gpl/bin/ffmpeg.exe", b"ffmpeg".as_slice()),
            ("ffmpeg-N-1-win64-gpl/bin/ffprobe.exe", b"ffprobe".as_slice()),
            ("ffmpeg-N-1-win64-gpl/LICENSE.txt", b"gpl".as_slice()),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    buf.into_inner()
}

#[tokio::test]
async fn archive_download_extracts_and_verifies_companions() {
    let server = serve("/ffmpeg.zip", 200, ffmpeg_zip()).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("resources").join("ffmpeg");
    let installer = ArchiveDownload::new(
        reqwest::Client::new(),
        format!("{}/ffmpeg.zip", server.uri()),
        dir.path().join("resources"),
        vec![
            ArchiveEntry::new("/bin/ffmpeg.exe", out.join("ffmpeg.exe")),
            ArchiveEntry::new("/bin/ffprobe.exe", out.join("ffprobe.exe")),
        ],
    );
    let resource = Resource::new("ffmpeg", "FFmpeg", out.join("ffmpeg.exe"), Arc::new(installer))
        .with_companion(out.join("ffprobe.exe"));

    let (reporter, seen) = recording();
    ToolVerifier::new().ensure(&resource, &reporter).await.unwrap();

    assert_eq!(std::fs::read(out.join("ffmpeg.exe")).unwrap(), b"ffmpeg");
    assert_eq!(std::fs::read(out.join("ffprobe.exe")).unwrap(), b"ffprobe");
    assert!(!dir.path().join("resources").join("ffmpeg.zip").exists());

    let steps: Vec<String> = seen.lock().unwrap().iter().map(|(d, _)| d.clone()).collect();
    for step in ["Checking", "Not found", "Downloading", "Extracting", "Verifying"] {
        assert!(steps.iter().any(|s| s == step), "missing step {step}: {steps:?}");
    }
}

#[tokio::test]
async fn archive_without_entry_is_invalid() {
    let server = serve("/ffmpeg.zip", 200, ffmpeg_zip()).await;
    let dir = tempfile::tempdir().unwrap();
    let installer = ArchiveDownload::new(
        reqwest::Client::new(),
        format!("{}/ffmpeg.zip", server.uri()),
        dir.path(),
        vec![ArchiveEntry::new("/bin/ffplay.exe", dir.path().join("ffplay.exe"))],
    );
    let resource = Resource::new("ffmpeg", "FFmpeg", dir.path().join("ffplay.exe"), Arc::new(installer.clone()));

    let err = installer
        .install(&resource, &ProgressReporter::noop())
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::InvalidArchive(_)));
}

/// A present but outdated binary is replaced by the download.
#[cfg(unix)]
#[tokio::test]
async fn outdated_binary_is_reinstalled() {
    use std::os::unix::fs::PermissionsExt;

    let script = |version: &str| format!("#!/bin/sh\necho {version}\n").into_bytes();
    let server = serve("/tool", 200, script("1.2")).await;
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("tool");
    std::fs::write(&bin, script("1.0")).unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

    let installer = BinaryDownload::new(reqwest::Client::new(), format!("{}/tool", server.uri()));
    let resource = Resource::new("tool", "Tool", &bin, Arc::new(installer)).with_version("1.2");

    let (reporter, seen) = recording();
    ToolVerifier::new().ensure(&resource, &reporter).await.unwrap();

    assert_eq!(std::fs::read(&bin).unwrap(), script("1.2"));
    assert!(seen.lock().unwrap().iter().any(|(d, _)| d == "Outdated"));
}

/// A download that still reports the old version fails instead of looping.
#[cfg(unix)]
#[tokio::test]
async fn still_outdated_after_install_is_version_mismatch() {
    use std::os::unix::fs::PermissionsExt;

    let server = serve("/tool", 200, b"#!/bin/sh\necho 1.1\n".to_vec()).await;
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("tool");
    std::fs::write(&bin, "#!/bin/sh\necho 1.0\n").unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

    let installer = BinaryDownload::new(reqwest::Client::new(), format!("{}/tool", server.uri()));
    let resource = Resource::new("tool", "Tool", &bin, Arc::new(installer)).with_version("1.2");

    let err = ToolVerifier::new()
        .ensure(&resource, &ProgressReporter::noop())
        .await
        .unwrap_err();
    match err {
        ResourceError::VersionMismatch { required, found, .. } => {
            assert_eq!(required, "1.2");
            assert_eq!(found.as_deref(), Some("1.1"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

/// Full pass: an outdated tool is upgraded, progress climbs to 100 and the
/// pass finishes with readiness set.
#[cfg(unix)]
#[tokio::test]
async fn setup_upgrades_outdated_tool_and_becomes_ready() {
    use std::os::unix::fs::PermissionsExt;
    use ytclip_events::EventBus;
    use ytclip_models::Event;
    use ytclip_resources::ResourceManager;

    let server = serve("/toolA", 200, b"#!/bin/sh\necho toolA 1.2.0\n".to_vec()).await;
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("toolA");
    std::fs::write(&bin, "#!/bin/sh\necho toolA 1.0.0\n").unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

    let installer = BinaryDownload::new(reqwest::Client::new(), format!("{}/toolA", server.uri()));
    let resource = Resource::new("toolA", "Tool A", &bin, Arc::new(installer)).with_version("1.2");

    let bus = EventBus::new(256);
    let mut rx = bus.subscribe();
    let manager = ResourceManager::new(vec![resource], Arc::new(ToolVerifier::new()), bus);

    manager.run_setup().await.unwrap();
    assert!(manager.is_ready());

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            Event::ResourceProgress(p) if p.key == "toolA" => Some(p.progress),
            _ => None,
        })
        .collect();
    assert!(progress.len() > 2);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "not increasing: {progress:?}");
    assert_eq!(progress.last(), Some(&100.0));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ResourceStop(p) if p.key == "toolA" && p.progress == 100.0)));
    assert_eq!(events.last(), Some(&Event::ResourceFinish));
}

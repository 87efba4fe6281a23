//! Import, edit and submit an ipa end to end

mod common;

use common::{write_png, IpaBuilder, TestWorkspace};
use silque::{
    extract_ipa_in, find_icon, load_icon, PlistFile, SessionState, SigningSession, SilqueError,
    TaskStatus,
};

#[test]
fn test_extracted_paths_exist() {
    let ws = TestWorkspace::new();
    let ipa = IpaBuilder::new()
        .app("Foo", &[("CFBundleIdentifier", "com.foo")])
        .write(&ws.path.join("Foo.ipa"));

    let bundle = extract_ipa_in(&ipa, ws.work_root()).unwrap();
    for path in [
        bundle.temp_dir(),
        bundle.payload(),
        bundle.app_path(),
        bundle.info_plist(),
    ] {
        assert!(path.exists(), "{} should exist", path.display());
    }
}

#[test]
fn test_missing_payload_leaves_nothing_behind() {
    let ws = TestWorkspace::new();
    let ipa = IpaBuilder::new()
        .file("Foo.app/Info.plist", b"<plist/>")
        .write(&ws.path.join("Foo.ipa"));

    let mut session = SigningSession::with_work_root(ws.work_root());
    let err = session.import(&ipa).unwrap_err();

    assert!(matches!(err, SilqueError::PayloadMissing));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.bundle().is_none());
    assert_eq!(ws.leftover_extractions(), 0);
}

#[test]
fn test_payload_without_app_is_bundle_missing() {
    let ws = TestWorkspace::new();
    let ipa = IpaBuilder::new()
        .file("Payload/Foo/Info.plist", b"<plist/>")
        .write(&ws.path.join("Foo.ipa"));

    let err = extract_ipa_in(&ipa, ws.work_root()).unwrap_err();
    assert!(matches!(err, SilqueError::BundleMissing));
}

#[test]
fn test_rename_keeps_bundle_id() {
    let ws = TestWorkspace::new();
    let ipa = IpaBuilder::new()
        .app(
            "Foo",
            &[("CFBundleDisplayName", "Foo"), ("CFBundleIdentifier", "com.foo")],
        )
        .write(&ws.path.join("Foo.ipa"));

    let mut session = SigningSession::with_work_root(ws.work_root());
    session.import(&ipa).unwrap();
    assert_eq!(session.display_name(), Some("Foo"));

    session.set_display_name("Bar").unwrap();

    let plist_path = session.bundle().unwrap().info_plist().to_path_buf();
    let pl = PlistFile::open(&plist_path).unwrap();
    assert_eq!(pl.get_string("CFBundleDisplayName"), Some("Bar"));
    assert_eq!(pl.get_string("CFBundleIdentifier"), Some("com.foo"));
    assert_eq!(pl.get_string("CFBundleExecutable"), Some("Foo"));
}

#[test]
fn test_display_name_falls_back_to_bundle_name() {
    let ws = TestWorkspace::new();
    let ipa = IpaBuilder::new()
        .app("Foo", &[("CFBundleName", "Short")])
        .write(&ws.path.join("Foo.ipa"));

    let mut session = SigningSession::with_work_root(ws.work_root());
    session.import(&ipa).unwrap();
    assert_eq!(session.display_name(), Some("Short"));
    assert_eq!(session.bundle_id(), Some(""));
}

#[test]
fn test_icon_edit_writes_existing_slots() {
    let ws = TestWorkspace::new();
    let ipa = IpaBuilder::new()
        .app("Foo", &[("CFBundleIdentifier", "com.foo")])
        .icon("Foo", "icon.png", 57)
        .icon("Foo", "AppIcon60x60@2x.png", 57)
        .write(&ws.path.join("Foo.ipa"));
    let new_icon = write_png(&ws.path.join("new.png"), 512, 256);

    let mut session = SigningSession::with_work_root(ws.work_root());
    session.import(&ipa).unwrap();
    assert_eq!(session.current_icon().unwrap().width(), 57);

    let report = session.set_icon(load_icon(&new_icon).unwrap()).unwrap();
    assert_eq!(report.written(), vec!["AppIcon60x60@2x.png", "icon.png"]);
    assert_eq!(session.current_icon().unwrap().width(), 512);

    let app = session.bundle().unwrap().app_path().to_path_buf();
    assert_eq!(
        image::image_dimensions(app.join("icon.png")).unwrap(),
        (60, 60)
    );
    assert_eq!(
        image::image_dimensions(app.join("AppIcon60x60@2x.png")).unwrap(),
        (120, 120)
    );
    for absent in ["AppIcon60x60@3x.png", "icon@3x.png", "icon@2x.png"] {
        assert!(!app.join(absent).exists());
    }
    // The locator now sees the replacement at the preferred slot.
    assert_eq!(find_icon(&app).unwrap().width(), 120);
}

#[test]
fn test_submit_records_one_task() {
    let ws = TestWorkspace::new();
    let ipa = IpaBuilder::new()
        .app("Foo", &[("CFBundleIdentifier", "com.foo")])
        .write(&ws.path.join("Foo.ipa"));

    let mut session = SigningSession::with_work_root(ws.work_root());
    session.import(&ipa).unwrap();

    assert!(matches!(session.submit(), Err(SilqueError::NoCertificate)));
    assert!(session.tasks().is_empty());

    session.select_certificate("Antony Dev");
    let task = session.submit().unwrap().clone();

    assert_eq!(session.tasks(), &[task.clone()]);
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.ipa_name, "Foo.ipa");
    assert_eq!(task.certificate, "Antony Dev");
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(ws.leftover_extractions(), 0);
}

#[test]
fn test_reimport_requires_cancel() {
    let ws = TestWorkspace::new();
    let first = IpaBuilder::new()
        .app("Foo", &[("CFBundleIdentifier", "com.foo")])
        .write(&ws.path.join("Foo.ipa"));
    let second = IpaBuilder::new()
        .app("Baz", &[("CFBundleIdentifier", "com.baz")])
        .write(&ws.path.join("Baz.ipa"));

    let mut session = SigningSession::with_work_root(ws.work_root());
    session.import(&first).unwrap();
    session.set_display_name("Edited").unwrap();

    assert!(matches!(
        session.import(&second),
        Err(SilqueError::SessionActive)
    ));
    assert_eq!(session.display_name(), Some("Edited"));

    session.cancel();
    assert_eq!(ws.leftover_extractions(), 0);

    session.import(&second).unwrap();
    assert_eq!(session.bundle_id(), Some("com.baz"));
    assert_eq!(ws.leftover_extractions(), 1);
}

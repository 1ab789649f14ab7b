use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use photo_md::config::Config;
use photo_md::container::jpeg::{Block, Jpeg};
use photo_md::driver::{execute, parse_command_line, Failure, Summary};
use photo_md::field;
use photo_md::filefmt::MediaFile;
use photo_md::operation::{parse_operation, Console};
use photo_md::tags::exif::{empty_block, DateTag, ExifTags};
use photo_md::tags::iptc::{IptcDate, IptcTags, DIGITAL_CREATION_DATE, KEYWORDS, OBJECT_NAME};
use photo_md::tags::xmp::{XmpTags, DC_SUBJECT, DC_TITLE, EXIF_DATE_TIME_ORIGINAL, LR_HIERARCHICAL_SUBJECT, XMP_CREATE_DATE};
use photo_md::value::DateTime;

// ── fixtures ─────────────────────────────────────────────────────────

/// A JPEG with a JFIF header, a scan and no metadata at all.
fn bare_jpeg() -> Vec<u8> {
    let mut f = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    f.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    f.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 1, 2, 3, 0xFF, 0xD9]);
    f
}

/// `bare_jpeg` with an IPTC block filled in by `fill`.
fn jpeg_with_iptc(fill: impl FnOnce(&mut IptcTags)) -> Vec<u8> {
    let mut iptc = IptcTags::new();
    fill(&mut iptc);
    let psir = iptc.render_psir().unwrap();
    Jpeg::parse(&bare_jpeg())
        .unwrap()
        .render(Block::Keep, Block::Keep, Block::Replace(&psir))
        .unwrap()
}

/// A TIFF whose only metadata is an EXIF Artist in IFD0.
fn tiff_with_artist(name: &str) -> Vec<u8> {
    let mut tags = empty_block();
    tags.set_artist(&[name.to_string()]);
    tags.render()
}

fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn words(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

/// Run one operation over one batch of files and save them.
fn apply(op_words: &[&str], files: &mut [MediaFile]) -> String {
    let args = words(op_words);
    let (mut op, rest) = parse_operation(&args, &field::ALL).unwrap().unwrap();
    assert!(rest.is_empty());
    let mut input = Cursor::new(Vec::new());
    let mut out = Vec::new();
    let mut console = Console {
        input: &mut input,
        output: &mut out,
    };
    op.run(files, &mut console).unwrap();
    op.finish(&mut console).unwrap();
    for f in files.iter_mut() {
        f.save(2048).unwrap();
    }
    String::from_utf8(out).unwrap()
}

/// Run an `md` command line in `dir`, returning the outcome and the output.
fn md(dir: &TempDir, line: &[&str], files: &[&PathBuf]) -> (Result<Summary, Failure>, String) {
    let config = Config {
        working_set: Some(dir.path().join(".md")),
        ..Config::default()
    };
    let mut args = words(line);
    args.extend(files.iter().map(|p| p.display().to_string()));
    let inv = parse_command_line(&args, &field::ALL).unwrap();
    let mut input = Cursor::new(Vec::new());
    let mut out = Vec::new();
    let mut console = Console {
        input: &mut input,
        output: &mut out,
    };
    let result = execute(inv, &config, &dir.path().display().to_string(), &mut console);
    (result, String::from_utf8(out).unwrap())
}

fn parsed(path: &Path) -> Jpeg {
    Jpeg::parse(&fs::read(path).unwrap()).unwrap()
}

fn xmp_of(path: &Path) -> XmpTags {
    XmpTags::parse(parsed(path).xmp().unwrap().unwrap()).unwrap()
}

fn iptc_of(path: &Path) -> IptcTags {
    IptcTags::from_psir(parsed(path).psir().as_deref()).unwrap()
}

// ── round trip ───────────────────────────────────────────────────────

#[test]
fn unmodified_file_is_not_rewritten() {
    let dir = TempDir::new().unwrap();
    let data = jpeg_with_iptc(|t| {
        t.set_string(OBJECT_NAME, "Kept").unwrap();
    });
    let path = write(&dir, "a.jpg", &data);

    let mut file = MediaFile::open(&path).unwrap();
    assert!(file.problems().is_empty());
    assert_eq!(field::TITLE.get(&file.providers()).len(), 1);
    apply(&["show", "all"], std::slice::from_mut(&mut file));
    assert!(!file.is_dirty());
    assert_eq!(fs::read(&path).unwrap(), data);
}

// ── set title ────────────────────────────────────────────────────────

#[test]
fn set_title_writes_xmp_and_iptc() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "a.jpg", &bare_jpeg());

    let mut file = MediaFile::open(&path).unwrap();
    apply(&["set", "title", "Hello"], std::slice::from_mut(&mut file));

    let xmp = xmp_of(&path);
    assert_eq!(xmp.alt(DC_TITLE).unwrap().default_value(), "Hello");
    assert_eq!(iptc_of(&path).string(OBJECT_NAME), "Hello");

    let mut again = MediaFile::open(&path).unwrap();
    assert!(again.problems().is_empty());
    assert_eq!(again.providers().title(), "Hello");
}

// ── datetime reconciliation ──────────────────────────────────────────

#[test]
fn reset_datetime_spreads_iptc_date() {
    let dir = TempDir::new().unwrap();
    let data = jpeg_with_iptc(|t| {
        let dt = DateTime::parse_iptc("20210621", "035500-0700").unwrap();
        t.set_date(IptcDate::Created, &dt).unwrap();
        t.set_date(IptcDate::DigitalCreation, &dt).unwrap();
    });
    let path = write(&dir, "a.jpg", &data);

    let mut file = MediaFile::open(&path).unwrap();
    let out = apply(&["show", "datetime"], std::slice::from_mut(&mut file));
    assert!(out.contains("2021-06-21T03:55:00-07:00"), "{out}");

    apply(&["reset", "datetime"], std::slice::from_mut(&mut file));

    let jpeg = parsed(&path);
    let exif = ExifTags::parse(jpeg.exif().unwrap()).unwrap();
    let original = exif.date_time(DateTag::Original).unwrap();
    assert_eq!(
        original.to_exif(),
        ("2021:06:21 03:55:00".to_string(), String::new(), "-07:00".to_string())
    );
    assert!(exif.date_time(DateTag::Modified).unwrap().is_empty());

    let xmp = xmp_of(&path);
    assert_eq!(xmp.date(EXIF_DATE_TIME_ORIGINAL).unwrap().to_string(), "2021-06-21T03:55:00-07:00");
    assert_eq!(xmp.date(XMP_CREATE_DATE).unwrap().to_string(), "2021-06-21T03:55:00-07:00");

    let iptc = iptc_of(&path);
    assert_eq!(iptc.date(IptcDate::Created).unwrap().to_string(), "2021-06-21T03:55:00-07:00");
    assert_eq!(iptc.string(DIGITAL_CREATION_DATE), "");
}

// ── keyword hierarchy ────────────────────────────────────────────────

#[test]
fn hierarchical_keyword_flattens_into_iptc() {
    let dir = TempDir::new().unwrap();
    let data = jpeg_with_iptc(|t| {
        t.set_strings(KEYWORDS, &["Alice".to_string()]).unwrap();
    });
    let path = write(&dir, "a.jpg", &data);

    let mut file = MediaFile::open(&path).unwrap();
    apply(&["add", "keyword", "People/Family/Alice"], std::slice::from_mut(&mut file));

    assert_eq!(iptc_of(&path).strings(KEYWORDS), vec!["Alice".to_string()]);
    let xmp = xmp_of(&path);
    assert!(xmp.list(DC_SUBJECT).unwrap().contains(&"Alice".to_string()));
    assert!(xmp
        .list(LR_HIERARCHICAL_SUBJECT)
        .unwrap()
        .contains(&"People|Family|Alice".to_string()));
}

// ── batch copy ───────────────────────────────────────────────────────

#[test]
fn batch_copy_reaches_variant_and_sidecar() {
    let dir = TempDir::new().unwrap();
    let original = write(&dir, "a.jpg", &bare_jpeg());
    let sidecar = write(&dir, "a.jpg.xmp", b"");
    let edited = write(&dir, "a.edited.jpg", &bare_jpeg());

    let mut file = MediaFile::open(&original).unwrap();
    apply(&["set", "title", "T1"], std::slice::from_mut(&mut file));

    let (result, _) = md(&dir, &["batch", "copy", "title"], &[&edited, &sidecar, &original]);
    let summary = result.unwrap();
    assert!(summary.failed.is_empty());
    assert_eq!(summary.exit_code(), 0);

    for path in [&edited, &sidecar] {
        let mut f = MediaFile::open(path).unwrap();
        assert_eq!(f.providers().title(), "T1", "{}", path.display());
    }
    assert_eq!(iptc_of(&edited).string(OBJECT_NAME), "T1");
}

// ── read-only operations ─────────────────────────────────────────────

#[test]
fn show_and_check_leave_files_untouched() {
    let dir = TempDir::new().unwrap();
    let bare = write(&dir, "a.jpg", &bare_jpeg());
    let iptc_only = write(
        &dir,
        "b.jpg",
        &jpeg_with_iptc(|t| {
            t.set_string(OBJECT_NAME, "Only IPTC").unwrap();
        }),
    );
    let tiff = write(&dir, "c.tif", &tiff_with_artist("Steve"));
    let files = [&bare, &iptc_only, &tiff];
    let before: Vec<Vec<u8>> = files.iter().map(|p| fs::read(p).unwrap()).collect();

    let (result, out) = md(&dir, &["show", "title", "artist"], &files);
    let summary = result.unwrap();
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.saved, 0);
    assert!(out.contains("Only IPTC"), "{out}");
    assert!(out.contains("Steve"), "{out}");

    let (result, out) = md(&dir, &["check", "title", "artist"], &files);
    let summary = result.unwrap();
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.saved, 0);
    assert!(out.contains("c.tif"), "{out}");

    let (result, _) = md(&dir, &["tags", "all"], &files);
    assert_eq!(result.unwrap().saved, 0);

    let after: Vec<Vec<u8>> = files.iter().map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(before, after);
}

#[test]
fn tiff_title_lands_in_ifd0() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "a.tif", &tiff_with_artist("Steve"));

    let (result, _) = md(&dir, &["set", "title", "Tiff"], &[&path]);
    let summary = result.unwrap();
    assert_eq!(summary.saved, 1);

    let mut again = MediaFile::open(&path).unwrap();
    assert!(again.problems().is_empty());
    assert_eq!(again.providers().title(), "Tiff");
    assert_eq!(again.providers().artist(), "Steve");
    assert!(!again.is_dirty());
}

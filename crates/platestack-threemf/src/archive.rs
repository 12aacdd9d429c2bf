//! 3MF package assembly for a compiled single-plate print job.
//!
//! The package carries no geometry. It is a G-code container laid out the
//! way Bambu-family hosts expect: the compiled G-code as plate 1, its MD5,
//! preview images and the manifests that point at them.

use std::io::{Cursor, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::checksum::md5_hex;
use crate::error::{Result, ThreeMfError};
use crate::placeholder::PlaceholderChain;
use crate::thumbnail::{make_thumbnails_async, Thumbnails};

/// Application name written to the model metadata.
pub const APPLICATION: &str = "BambuStudio-2.0.0";

/// Project name used when no custom name is given.
pub const DEFAULT_PROJECT_NAME: &str = "Compiled Print Job";

/// Part names, in the order they are written.
pub const PART_NAMES: [&str; 14] = [
    "[Content_Types].xml",
    "_rels/.rels",
    "3D/3dmodel.model",
    "Metadata/plate_1.gcode",
    "Metadata/plate_1.gcode.md5",
    "Metadata/plate_1.png",
    "Metadata/plate_1_small.png",
    "Metadata/top_1.png",
    "Metadata/pick_1.png",
    "Metadata/model_settings.config",
    "Metadata/_rels/model_settings.config.rels",
    "Metadata/plate_1.json",
    "Metadata/project_settings.config",
    "Metadata/slice_info.config",
];

/// Caller options for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageOptions {
    /// Display name for the plate and project.
    pub custom_name: Option<String>,
}

impl PackageOptions {
    /// Options with a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            custom_name: Some(name.into()),
        }
    }

    fn name(&self) -> Option<&str> {
        self.custom_name.as_deref().filter(|n| !n.is_empty())
    }
}

/// A compiled job ready to be packaged.
pub struct ThreeMfPackage<'a> {
    gcode: &'a str,
    thumbnails: Thumbnails,
    options: PackageOptions,
    created_at: DateTime<Utc>,
}

impl<'a> ThreeMfPackage<'a> {
    /// Create a package stamped with the current time.
    ///
    /// Thumbnails that do not have the fixed 512/128 sizes are replaced by
    /// drawn placeholders.
    pub fn new(gcode: &'a str, thumbnails: Thumbnails, options: PackageOptions) -> Self {
        let thumbnails = if thumbnails.has_expected_sizes() {
            thumbnails
        } else {
            tracing::warn!(
                large = ?(thumbnails.large.width(), thumbnails.large.height()),
                small = ?(thumbnails.small.width(), thumbnails.small.height()),
                "thumbnails have wrong sizes, using placeholder"
            );
            Thumbnails::placeholder()
        };
        Self {
            gcode,
            thumbnails,
            options,
            created_at: Utc::now(),
        }
    }

    /// Override the creation timestamp.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Generate the archive. Either the whole archive is returned or an error.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let large_png = self.thumbnails.large.to_png()?;
        let small_png = self.thumbnails.small.to_png()?;

        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(6));

        let mut part = |name: &str, data: &[u8]| -> Result<()> {
            tracing::debug!(part = name, bytes = data.len(), "writing 3MF part");
            zip.start_file(name, options)?;
            zip.write_all(data)?;
            Ok(())
        };

        part("[Content_Types].xml", content_types_xml().as_bytes())?;
        part("_rels/.rels", rels_xml().as_bytes())?;
        part("3D/3dmodel.model", self.model_xml().as_bytes())?;
        part("Metadata/plate_1.gcode", self.gcode.as_bytes())?;
        part("Metadata/plate_1.gcode.md5", md5_hex(self.gcode.as_bytes()).as_bytes())?;
        part("Metadata/plate_1.png", &large_png)?;
        part("Metadata/plate_1_small.png", &small_png)?;
        part("Metadata/top_1.png", &large_png)?;
        part("Metadata/pick_1.png", &large_png)?;
        part("Metadata/model_settings.config", self.model_settings_xml().as_bytes())?;
        part(
            "Metadata/_rels/model_settings.config.rels",
            model_settings_rels_xml().as_bytes(),
        )?;
        part("Metadata/plate_1.json", plate_json()?.as_bytes())?;
        part("Metadata/project_settings.config", self.project_settings_json()?.as_bytes())?;
        part("Metadata/slice_info.config", slice_info_json()?.as_bytes())?;

        zip.finish()?;
        Ok(buffer.into_inner())
    }

    fn model_xml(&self) -> String {
        let date = self.created_at.format("%Y-%m-%d");
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:BambuStudio="http://schemas.bambulab.com/package/2021" xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06" requiredextensions="p">
 <metadata name="Application">{APPLICATION}</metadata>
 <metadata name="BambuStudio:3mfVersion">1</metadata>
 <metadata name="Copyright"></metadata>
 <metadata name="CreationDate">{date}</metadata>
 <metadata name="Description"></metadata>
 <metadata name="Designer"></metadata>
 <metadata name="DesignerCover"></metadata>
 <metadata name="DesignerUserId"></metadata>
 <metadata name="License"></metadata>
 <metadata name="ModificationDate">{date}</metadata>
 <metadata name="Origin"></metadata>
 <metadata name="Title">{title}</metadata>
 <resources>
 </resources>
 <build/>
</model>"#,
            title = escape(self.options.name().unwrap_or("")),
        )
    }

    fn model_settings_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <plate>
    <metadata key="plater_id" value="1"/>
    <metadata key="plater_name" value="{}"/>
    <metadata key="locked" value="false"/>
    <metadata key="gcode_file" value="Metadata/plate_1.gcode"/>
    <metadata key="thumbnail_file" value="Metadata/plate_1.png"/>
    <metadata key="top_file" value="Metadata/top_1.png"/>
    <metadata key="pick_file" value="Metadata/pick_1.png"/>
    <metadata key="pattern_bbox_file" value="Metadata/plate_1.json"/>
  </plate>
</config>
"#,
            escape(self.options.name().unwrap_or(""))
        )
    }

    fn project_settings_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&serde_json::json!({
            "version": "1.0.0",
            "project": {
                "name": self.options.name().unwrap_or(DEFAULT_PROJECT_NAME),
                "created_at": self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            }
        }))?)
    }
}

fn content_types_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
 <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
 <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
 <Default Extension="png" ContentType="image/png"/>
 <Default Extension="gcode" ContentType="text/x.gcode"/>
</Types>"#
}

fn rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
 <Relationship Target="/Metadata/plate_1.png" Id="rel-2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail"/>
 <Relationship Target="/Metadata/plate_1.png" Id="rel-4" Type="http://schemas.bambulab.com/package/2021/cover-thumbnail-middle"/>
 <Relationship Target="/Metadata/plate_1_small.png" Id="rel-5" Type="http://schemas.bambulab.com/package/2021/cover-thumbnail-small"/>
</Relationships>"#
}

fn model_settings_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/Metadata/plate_1.gcode" Id="rel-1" Type="http://schemas.bambulab.com/package/2021/gcode"/>
</Relationships>"#
}

fn plate_json() -> Result<String> {
    Ok(serde_json::to_string(&serde_json::json!({
        "plate_index": 1,
        "thumbnail": "plate_1.png",
        "small_thumbnail": "plate_1_small.png",
        "top_thumbnail": "top_1.png",
        "pick_thumbnail": "pick_1.png"
    }))?)
}

fn slice_info_json() -> Result<String> {
    Ok(serde_json::to_string(&serde_json::json!({
        "version": "1.0.0",
        "plate_info": [{
            "plate_index": 1,
            "gcode_file": "plate_1.gcode"
        }]
    }))?)
}

/// Package `gcode` with ready-made thumbnails.
pub fn build(gcode: &str, thumbnails: Thumbnails, options: PackageOptions) -> Result<Vec<u8>> {
    ThreeMfPackage::new(gcode, thumbnails, options).to_bytes()
}

/// Produce thumbnails from `thumbnail_source` (or the placeholder chain) and
/// package `gcode`, with the CPU-bound work on tokio's blocking pool.
pub async fn build_async(
    gcode: String,
    thumbnail_source: Option<Vec<u8>>,
    placeholder: PlaceholderChain,
    options: PackageOptions,
) -> Result<Vec<u8>> {
    let thumbnails = make_thumbnails_async(thumbnail_source, placeholder).await;
    tokio::task::spawn_blocking(move || build(&gcode, thumbnails, options))
        .await
        .map_err(|e| ThreeMfError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbnail::Thumbnail;
    use chrono::TimeZone;
    use image::RgbaImage;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::collections::BTreeSet;
    use std::io::Read;

    const GCODE: &str = "; Compiled GCode File\nG28\nG1 X10 Y10\n";

    fn open(bytes: &[u8]) -> zip::ZipArchive<Cursor<&[u8]>> {
        zip::ZipArchive::new(Cursor::new(bytes)).unwrap()
    }

    fn read_part(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = open(bytes);
        let mut file = archive.by_name(name).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        data
    }

    fn read_text(bytes: &[u8], name: &str) -> String {
        String::from_utf8(read_part(bytes, name)).unwrap()
    }

    fn relationship_targets(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut targets = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"Relationship" => {
                    let target = e.try_get_attribute("Target").unwrap().unwrap();
                    targets.push(target.unescape_value().unwrap().into_owned());
                }
                Event::Eof => break,
                _ => {}
            }
        }
        targets
    }

    fn package(options: PackageOptions) -> Vec<u8> {
        ThreeMfPackage::new(GCODE, Thumbnails::placeholder(), options)
            .created_at(Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap())
            .to_bytes()
            .unwrap()
    }

    #[test]
    fn test_threemf_generation() {
        let bytes = package(PackageOptions::default());
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn test_exact_part_set() {
        let bytes = package(PackageOptions::default());
        let archive = open(&bytes);
        let names: BTreeSet<&str> = archive.file_names().collect();
        let expected: BTreeSet<&str> = PART_NAMES.iter().copied().collect();
        assert_eq!(names, expected);
        assert_eq!(archive.len(), PART_NAMES.len());
    }

    #[test]
    fn test_entries_deflated() {
        let bytes = package(PackageOptions::default());
        let mut archive = open(&bytes);
        for i in 0..archive.len() {
            let file = archive.by_index(i).unwrap();
            assert_eq!(file.compression(), zip::CompressionMethod::Deflated, "{}", file.name());
        }
    }

    #[test]
    fn test_relationship_targets_resolve() {
        let bytes = package(PackageOptions::default());
        let archive = open(&bytes);
        let names: BTreeSet<String> = archive.file_names().map(String::from).collect();
        for rels in ["_rels/.rels", "Metadata/_rels/model_settings.config.rels"] {
            let targets = relationship_targets(&read_text(&bytes, rels));
            assert!(!targets.is_empty());
            for target in targets {
                let part = target.trim_start_matches('/');
                assert!(names.contains(part), "{rels} points at missing {target}");
            }
        }
    }

    #[test]
    fn test_gcode_and_checksum() {
        let bytes = package(PackageOptions::default());
        assert_eq!(read_text(&bytes, "Metadata/plate_1.gcode"), GCODE);
        assert_eq!(
            read_text(&bytes, "Metadata/plate_1.gcode.md5"),
            md5_hex(GCODE.as_bytes())
        );
    }

    #[test]
    fn test_thumbnail_parts() {
        let bytes = package(PackageOptions::default());
        let large = read_part(&bytes, "Metadata/plate_1.png");
        assert_eq!(read_part(&bytes, "Metadata/top_1.png"), large);
        assert_eq!(read_part(&bytes, "Metadata/pick_1.png"), large);

        let decoded = image::load_from_memory(&large).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (512, 512));
        let small = image::load_from_memory(&read_part(&bytes, "Metadata/plate_1_small.png")).unwrap();
        assert_eq!((small.width(), small.height()), (128, 128));
    }

    #[test]
    fn test_content_types() {
        let bytes = package(PackageOptions::default());
        let xml = read_text(&bytes, "[Content_Types].xml");
        for ext in ["rels", "model", "png", "gcode"] {
            assert!(xml.contains(&format!("Extension=\"{ext}\"")), "{ext}");
        }
    }

    #[test]
    fn test_model_dates() {
        let bytes = package(PackageOptions::default());
        let xml = read_text(&bytes, "3D/3dmodel.model");
        assert!(xml.contains("<metadata name=\"CreationDate\">2024-06-02</metadata>"));
        assert!(xml.contains("<metadata name=\"ModificationDate\">2024-06-02</metadata>"));
        assert!(xml.contains("<build/>"));
        assert!(!xml.contains("<object"));
    }

    #[test]
    fn test_custom_name_escaped() {
        let bytes = package(PackageOptions::named("Tom & Jerry <v2>"));
        let settings = read_text(&bytes, "Metadata/model_settings.config");
        assert!(settings.contains(r#"value="Tom &amp; Jerry &lt;v2&gt;""#));

        let project: serde_json::Value =
            serde_json::from_slice(&read_part(&bytes, "Metadata/project_settings.config")).unwrap();
        assert_eq!(project["project"]["name"], "Tom & Jerry <v2>");
        assert_eq!(project["project"]["created_at"], "2024-06-02T08:00:00.000Z");
    }

    #[test]
    fn test_default_project_name() {
        let bytes = package(PackageOptions::default());
        let project: serde_json::Value =
            serde_json::from_slice(&read_part(&bytes, "Metadata/project_settings.config")).unwrap();
        assert_eq!(project["project"]["name"], DEFAULT_PROJECT_NAME);

        let plate: serde_json::Value =
            serde_json::from_slice(&read_part(&bytes, "Metadata/plate_1.json")).unwrap();
        assert_eq!(plate["plate_index"], 1);
        assert_eq!(plate["small_thumbnail"], "plate_1_small.png");

        let slice: serde_json::Value =
            serde_json::from_slice(&read_part(&bytes, "Metadata/slice_info.config")).unwrap();
        assert_eq!(slice["plate_info"][0]["gcode_file"], "plate_1.gcode");
    }

    #[test]
    fn test_wrong_thumbnail_sizes_replaced() {
        let odd = Thumbnails {
            large: Thumbnail::new(RgbaImage::new(10, 10)),
            small: Thumbnail::new(RgbaImage::new(10, 10)),
        };
        let bytes = build(GCODE, odd, PackageOptions::default()).unwrap();
        let large = image::load_from_memory(&read_part(&bytes, "Metadata/plate_1.png")).unwrap();
        assert_eq!((large.width(), large.height()), (512, 512));
    }

    #[tokio::test]
    async fn test_build_async_with_bad_image() {
        let bytes = build_async(
            GCODE.to_string(),
            Some(b"not a png".to_vec()),
            PlaceholderChain::default(),
            PackageOptions::named("batch"),
        )
        .await
        .unwrap();
        assert_eq!(open(&bytes).len(), PART_NAMES.len());
        assert!(read_text(&bytes, "Metadata/model_settings.config").contains(r#"value="batch""#));
    }
}

pub const NS_X: &str = "adobe:ns:meta/";
pub const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

pub const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
pub const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
pub const NS_XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
pub const NS_XMP_NOTE: &str = "http://ns.adobe.com/xmp/note/";
pub const NS_EXIF: &str = "http://ns.adobe.com/exif/1.0/";
pub const NS_EXIF_EX: &str = "http://cipa.jp/exif/1.0/";
pub const NS_TIFF: &str = "http://ns.adobe.com/tiff/1.0/";
pub const NS_PHOTOSHOP: &str = "http://ns.adobe.com/photoshop/1.0/";
pub const NS_LR: &str = "http://ns.adobe.com/lightroom/1.0/";
pub const NS_MWG_RS: &str = "http://www.metadataworkinggroup.com/schemas/regions/";
pub const NS_ST_AREA: &str = "http://ns.adobe.com/xmp/sType/Area#";
pub const NS_ST_DIM: &str = "http://ns.adobe.com/xap/1.0/sType/Dimensions#";
pub const NS_IPTC_CORE: &str = "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/";
pub const NS_IPTC_EXT: &str = "http://iptc.org/std/Iptc4xmpExt/2008-02-29/";
pub const NS_DIGIKAM: &str = "http://www.digikam.org/ns/1.0/";
pub const NS_MP: &str = "http://ns.microsoft.com/photo/1.2/";
pub const NS_MPRI: &str = "http://ns.microsoft.com/photo/1.2/t/RegionInfo#";
pub const NS_MPREG: &str = "http://ns.microsoft.com/photo/1.2/t/Region#";
pub const NS_MS_PHOTO: &str = "http://ns.microsoft.com/photo/1.0/";
pub const NS_ACDSEE: &str = "http://ns.acdsee.com/iptc/1.0/";

/// Preferred prefixes, used when encoding regardless of what the source
/// packet called them.
const KNOWN: &[(&str, &str)] = &[
    (NS_ACDSEE, "acdsee"),
    (NS_DC, "dc"),
    (NS_DIGIKAM, "digiKam"),
    (NS_EXIF, "exif"),
    (NS_EXIF_EX, "exifEX"),
    (NS_IPTC_CORE, "Iptc4xmpCore"),
    (NS_IPTC_EXT, "Iptc4xmpExt"),
    (NS_LR, "lr"),
    (NS_MP, "MP"),
    (NS_MPREG, "MPReg"),
    (NS_MPRI, "MPRI"),
    (NS_MS_PHOTO, "MicrosoftPhoto"),
    (NS_MWG_RS, "mwg-rs"),
    (NS_PHOTOSHOP, "photoshop"),
    (NS_RDF, "rdf"),
    (NS_ST_AREA, "stArea"),
    (NS_ST_DIM, "stDim"),
    (NS_TIFF, "tiff"),
    (NS_X, "x"),
    (NS_XML, "xml"),
    (NS_XMP, "xmp"),
    (NS_XMP_MM, "xmpMM"),
    (NS_XMP_NOTE, "xmpNote"),
];

pub fn known_prefix(uri: &str) -> Option<&'static str> {
    KNOWN.iter().find(|(u, _)| *u == uri).map(|(_, p)| *p)
}

pub fn is_known_prefix(prefix: &str) -> bool {
    KNOWN.iter().any(|(_, p)| *p == prefix)
}

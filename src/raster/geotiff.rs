//! Point reads from a georeferenced TIFF
//!
//! Only the first image (full resolution) is used. Chunks are decoded on
//! demand, so a cloud-optimized file behind a range reader transfers only the
//! header and the chunk that covers the requested point.

use std::collections::HashMap;
use std::io::{Read, Seek};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::SampleError;
use crate::models::{CoordinatePair, SpatialReference};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_RASTER_TYPE_KEY: u32 = 1025;
const PROJECTED_CS_TYPE_KEY: u32 = 3072;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const USER_DEFINED: u32 = 32767;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// North-up mapping between cell indices and projected coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Projected x of the outer left edge
    pub origin_x: f64,
    /// Projected y of the outer top edge
    pub origin_y: f64,
    pub cell_width: f64,
    /// Positive; rows advance southwards
    pub cell_height: f64,
}

impl GeoTransform {
    /// Continuous (column, row) position of a projected point
    #[must_use]
    pub fn cell_position(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.cell_width,
            (self.origin_y - y) / self.cell_height,
        )
    }
}

/// An opened GeoTIFF ready for point reads
pub struct GeoRaster<R: Read + Seek> {
    decoder: Decoder<R>,
    width: u32,
    height: u32,
    transform: GeoTransform,
    nodata: Option<f64>,
    epsg: Option<u32>,
    source: String,
}

impl<R: Read + Seek> GeoRaster<R> {
    /// Read the header and georeferencing of the first image
    pub fn open(reader: R, source: &str) -> Result<Self, SampleError> {
        let tiff_err = |e| SampleError::from_tiff(e, source);

        let mut decoder = Decoder::new(reader).map_err(tiff_err)?;
        let (width, height) = decoder.dimensions().map_err(tiff_err)?;

        let geo_keys = read_geo_keys(&mut decoder).map_err(tiff_err)?;
        let epsg = geo_keys
            .get(&PROJECTED_CS_TYPE_KEY)
            .copied()
            .filter(|&code| code != USER_DEFINED);
        let pixel_is_point = geo_keys.get(&GT_RASTER_TYPE_KEY) == Some(&RASTER_PIXEL_IS_POINT);

        let transform = read_transform(&mut decoder, pixel_is_point, source)?;
        let nodata = read_nodata(&mut decoder).map_err(tiff_err)?;

        debug!(
            source,
            width,
            height,
            ?epsg,
            ?nodata,
            "Opened raster with cell size {}x{}",
            transform.cell_width,
            transform.cell_height
        );

        Ok(Self {
            decoder,
            width,
            height,
            transform,
            nodata,
            epsg,
            source: source.to_string(),
        })
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    /// EPSG code declared by the file, if any
    #[must_use]
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Value of the cell covering `point`, nearest-cell semantics
    pub fn sample<C: SpatialReference>(
        &mut self,
        point: CoordinatePair<C>,
    ) -> Result<f64, SampleError> {
        if let Some(found) = self.epsg {
            if found != C::EPSG {
                return Err(SampleError::CrsMismatch {
                    expected: C::EPSG,
                    found,
                });
            }
        }

        let (col, row) = self
            .transform
            .cell_position(point.easting(), point.northing());
        let inside = col >= 0.0
            && row >= 0.0
            && col < f64::from(self.width)
            && row < f64::from(self.height);
        if !inside {
            return Err(SampleError::OutOfExtent {
                easting: point.easting(),
                northing: point.northing(),
            });
        }

        // Truncation is the floor here; both are non-negative and in range.
        let (value, single_precision) = self.read_cell(col as u32, row as u32)?;

        if value.is_nan()
            || self
                .nodata
                .is_some_and(|nodata| matches_nodata(value, nodata, single_precision))
        {
            return Err(SampleError::NoData);
        }
        Ok(value)
    }

    /// Cell value, and whether the file stores it as f32
    fn read_cell(&mut self, col: u32, row: u32) -> Result<(f64, bool), SampleError> {
        let (chunk_width, chunk_height) = self.decoder.chunk_dimensions();
        let chunks_across = self.width.div_ceil(chunk_width);
        let chunk_index = (row / chunk_height) * chunks_across + col / chunk_width;
        let (data_width, data_height) = self.decoder.chunk_data_dimensions(chunk_index);

        let chunk = self
            .decoder
            .read_chunk(chunk_index)
            .map_err(|e| SampleError::from_tiff(e, &self.source))?;
        let (values, single_precision) = chunk_values(chunk)
            .ok_or_else(|| SampleError::format("unsupported sample format"))?;

        let cells = data_width as usize * data_height as usize;
        let samples_per_pixel = (values.len() / cells.max(1)).max(1);
        let cell = (row % chunk_height) as usize * data_width as usize + (col % chunk_width) as usize;

        values
            .get(cell * samples_per_pixel)
            .map(|&value| (value, single_precision))
            .ok_or_else(|| {
                SampleError::format(format!(
                    "cell ({col}, {row}) lies outside decoded chunk {chunk_index}"
                ))
            })
    }
}

fn read_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    pixel_is_point: bool,
    source: &str,
) -> Result<GeoTransform, SampleError> {
    let tiff_err = |e| SampleError::from_tiff(e, source);
    let scale = find_f64s(decoder, MODEL_PIXEL_SCALE).map_err(tiff_err)?;
    let tiepoint = find_f64s(decoder, MODEL_TIEPOINT).map_err(tiff_err)?;
    let matrix = find_f64s(decoder, MODEL_TRANSFORMATION).map_err(tiff_err)?;

    let mut transform = match (scale, tiepoint, matrix) {
        (Some(scale), Some(tie), _) if scale.len() >= 2 && tie.len() >= 6 => GeoTransform {
            origin_x: tie[3] - tie[0] * scale[0],
            origin_y: tie[4] + tie[1] * scale[1],
            cell_width: scale[0],
            cell_height: scale[1],
        },
        (_, _, Some(m)) if m.len() >= 16 => {
            if m[1] != 0.0 || m[4] != 0.0 {
                return Err(SampleError::format("rotated rasters are not supported"));
            }
            GeoTransform {
                origin_x: m[3],
                origin_y: m[7],
                cell_width: m[0],
                cell_height: -m[5],
            }
        }
        _ => return Err(SampleError::format("raster carries no georeferencing")),
    };

    if !(transform.cell_width > 0.0 && transform.cell_height > 0.0) {
        return Err(SampleError::format(format!(
            "unsupported cell size {}x{}",
            transform.cell_width, transform.cell_height
        )));
    }

    // Tie points name cell centers for point rasters
    if pixel_is_point {
        transform.origin_x -= transform.cell_width / 2.0;
        transform.origin_y += transform.cell_height / 2.0;
    }

    Ok(transform)
}

fn find_f64s<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> tiff::TiffResult<Option<Vec<f64>>> {
    decoder
        .find_tag(tag(code))?
        .map(|value| value.into_f64_vec())
        .transpose()
}

/// Inline GeoKey values by key id
fn read_geo_keys<R: Read + Seek>(decoder: &mut Decoder<R>) -> tiff::TiffResult<HashMap<u32, u32>> {
    let Some(directory) = decoder.find_tag(tag(GEO_KEY_DIRECTORY))? else {
        return Ok(HashMap::new());
    };
    Ok(parse_geo_keys(&directory.into_u32_vec()?))
}

fn parse_geo_keys(directory: &[u32]) -> HashMap<u32, u32> {
    let Some(&count) = directory.get(3) else {
        return HashMap::new();
    };
    directory
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(4)
        .take(count as usize)
        // Location 0 means the value is stored inline
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> tiff::TiffResult<Option<f64>> {
    let Some(value) = decoder.find_tag(tag(GDAL_NODATA))? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    Ok(text.trim_matches(|c: char| c.is_whitespace() || c == '\0').parse().ok())
}

/// Compares in the precision the cell was stored in
fn matches_nodata(value: f64, nodata: f64, single_precision: bool) -> bool {
    if single_precision {
        value as f32 == nodata as f32
    } else {
        value == nodata
    }
}

fn chunk_values(chunk: DecodingResult) -> Option<(Vec<f64>, bool)> {
    let values = match chunk {
        DecodingResult::F32(v) => return Some((v.into_iter().map(f64::from).collect(), true)),
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F64(v) => v,
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some((values, false))
}

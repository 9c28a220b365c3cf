//! Local stand-ins for the search service and the raster host

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

pub const NODATA: f64 = -9999.0;

/// Bind an ephemeral port and serve `router` in the background
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// An address nothing listens on
pub async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// --- search service ---

pub struct FakeSearch {
    pub answers: HashMap<String, Value>,
    pub status: StatusCode,
    pub delay: Option<Duration>,
    pub requests: AtomicUsize,
    pub last_search_text: Mutex<Option<String>>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            status: StatusCode::OK,
            delay: None,
            requests: AtomicUsize::new(0),
            last_search_text: Mutex::new(None),
        }
    }

    pub fn with_place(mut self, name: &str, attrs: Value) -> Self {
        self.answers
            .insert(name.to_string(), json!({ "results": [ { "attrs": attrs } ] }));
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

async fn search(
    State(state): State<Arc<FakeSearch>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }
    if state.status != StatusCode::OK {
        return state.status.into_response();
    }
    if params.get("type").map(String::as_str) != Some("locations")
        || params.get("sr").map(String::as_str) != Some("2056")
    {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let text = params.get("searchText").cloned().unwrap_or_default();
    *state.last_search_text.lock().unwrap() = Some(text.clone());

    let body = state
        .answers
        .get(&text)
        .cloned()
        .unwrap_or_else(|| json!({ "results": [] }));
    Json(body).into_response()
}

/// Returns the search endpoint URL
pub async fn spawn_search(state: Arc<FakeSearch>) -> String {
    let base = spawn(Router::new().route("/SearchServer", get(search)).with_state(state)).await;
    format!("{base}/SearchServer")
}

// --- raster host ---

pub struct FakeRasterHost {
    pub files: HashMap<String, Vec<u8>>,
    pub honor_range: bool,
    pub delay: Option<Duration>,
    pub requests: AtomicUsize,
}

impl FakeRasterHost {
    pub fn new(files: HashMap<String, Vec<u8>>) -> Self {
        Self {
            files,
            honor_range: true,
            delay: None,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

fn parse_range(value: &str, len: usize) -> Option<(usize, usize)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end: usize = end.parse::<usize>().ok()?.min(len.checked_sub(1)?);
    (start <= end).then_some((start, end))
}

async fn raster(
    State(state): State<Arc<FakeRasterHost>>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }
    let Some(bytes) = state.files.get(&file) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .filter(|_| state.honor_range)
        .and_then(|v| parse_range(v, bytes.len()));

    match range {
        Some((start, end)) => (
            StatusCode::PARTIAL_CONTENT,
            [(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{}", bytes.len()),
            )],
            bytes[start..=end].to_vec(),
        )
            .into_response(),
        None => bytes.clone().into_response(),
    }
}

/// Returns the base URL rasters are served under
pub async fn spawn_rasters(state: Arc<FakeRasterHost>) -> String {
    let base = spawn(Router::new().route("/rasters/{file}", get(raster)).with_state(state)).await;
    format!("{base}/rasters")
}

// --- rasters ---

/// LV95 GeoTIFF of `size`x`size` cells of 10 m, no-data everywhere except the
/// cell covering (2 600 000, 1 200 000), which holds `value`.
///
/// Large enough that the target cell lies beyond the first range block.
pub fn point_raster(value: f64) -> Vec<u8> {
    let size: u32 = 300;
    let cell = 10.0;
    let origin = (2_598_500.0, 1_201_500.0);
    let target = (150 * size + 150) as usize;

    let mut data = vec![NODATA; (size * size) as usize];
    data[target] = value;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut tiff = TiffEncoder::new(&mut cursor).unwrap();
        let mut image = tiff
            .new_image::<colortype::Gray64Float>(size, size)
            .unwrap();
        let dir = image.encoder();
        dir.write_tag(Tag::from_u16_exhaustive(33550), &[cell, cell, 0.0][..])
            .unwrap();
        dir.write_tag(
            Tag::from_u16_exhaustive(33922),
            &[0.0, 0.0, 0.0, origin.0, origin.1, 0.0][..],
        )
        .unwrap();
        dir.write_tag(
            Tag::from_u16_exhaustive(34735),
            &[1u16, 1, 0, 2, 1025, 0, 1, 1, 3072, 0, 1, 2056][..],
        )
        .unwrap();
        dir.write_tag(Tag::from_u16_exhaustive(42113), "-9999").unwrap();
        image.write_data(&data).unwrap();
    }
    cursor.into_inner()
}

/// `so2_<year>.tif` files for each (year, value)
pub fn yearly_files(values: &[(i32, f64)]) -> HashMap<String, Vec<u8>> {
    values
        .iter()
        .map(|&(year, value)| (format!("so2_{year}.tif"), point_raster(value)))
        .collect()
}

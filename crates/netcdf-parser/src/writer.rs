//! Writing and reading critical-depth tiles.
//!
//! A tile is a NetCDF-4 file with dimensions `time(1)`, `lat` and `lon`, CF
//! coordinate variables for all three, and any number of data variables laid
//! out as `[time, lat, lon]`. Data variables are deflate-compressed.

use std::path::Path;

use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{get_f32_attr, has_attr, open_existing, read_axis, silence_hdf5_errors};

/// Units of the `time` coordinate.
pub const TIME_UNITS: &str = "days since 1970-01-01";

const DEFLATE_LEVEL: i32 = 5;

/// Attribute values the tile layout uses.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Double(f64),
    Float(f32),
    Int(i32),
    Bytes(Vec<u8>),
    Doubles(Vec<f64>),
}

impl AttrValue {
    pub fn text(value: impl Into<String>) -> Self {
        AttrValue::Text(value.into())
    }

    /// The value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn to_netcdf(&self) -> netcdf::AttributeValue {
        match self {
            AttrValue::Text(s) => s.as_str().into(),
            AttrValue::Double(v) => (*v).into(),
            AttrValue::Float(v) => (*v).into(),
            AttrValue::Int(v) => (*v).into(),
            AttrValue::Bytes(v) => v.clone().into(),
            AttrValue::Doubles(v) => v.clone().into(),
        }
    }

    fn from_netcdf(value: netcdf::AttributeValue) -> Option<Self> {
        use netcdf::AttributeValue as V;
        match value {
            V::Str(s) => Some(AttrValue::Text(s)),
            V::Double(v) => Some(AttrValue::Double(v)),
            V::Float(v) => Some(AttrValue::Float(v)),
            V::Int(v) => Some(AttrValue::Int(v)),
            V::Uchar(v) => Some(AttrValue::Bytes(vec![v])),
            V::Uchars(v) => Some(AttrValue::Bytes(v)),
            V::Doubles(v) => Some(AttrValue::Doubles(v)),
            _ => None,
        }
    }
}

/// Values of one data variable, row-major over `lat x lon`.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValues {
    F32(Vec<f32>),
    U8(Vec<u8>),
}

impl DataValues {
    pub fn len(&self) -> usize {
        match self {
            DataValues::F32(v) => v.len(),
            DataValues::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            DataValues::F32(v) => Some(v),
            DataValues::U8(_) => None,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            DataValues::U8(v) => Some(v),
            DataValues::F32(_) => None,
        }
    }
}

/// One `[time, lat, lon]` data variable.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub values: DataValues,
    /// `_FillValue`, only meaningful for float variables.
    pub fill_value: Option<f32>,
    pub attributes: Vec<(String, AttrValue)>,
}

impl DataVariable {
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        lookup(&self.attributes, name)
    }
}

/// Everything written into one tile file.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDataset {
    /// Row latitudes (cell centres).
    pub lats: Vec<f64>,
    /// Column longitudes (cell centres).
    pub lons: Vec<f64>,
    /// The single time value, in [`TIME_UNITS`].
    pub time: f64,
    pub variables: Vec<DataVariable>,
    pub global_attributes: Vec<(String, AttrValue)>,
}

impl TileDataset {
    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn global_attribute(&self, name: &str) -> Option<&AttrValue> {
        lookup(&self.global_attributes, name)
    }
}

fn lookup<'a>(attrs: &'a [(String, AttrValue)], name: &str) -> Option<&'a AttrValue> {
    attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

/// Write `tile` to `path`, replacing any existing file.
pub fn write_tile<P: AsRef<Path>>(path: P, tile: &TileDataset) -> NetCdfResult<()> {
    let path = path.as_ref();
    let cells = tile.lats.len() * tile.lons.len();
    if cells == 0 {
        return Err(NetCdfError::write_failed("tile has an empty lat or lon axis"));
    }
    for var in &tile.variables {
        if var.values.len() != cells {
            return Err(NetCdfError::write_failed(format!(
                "variable '{}' has {} values, grid has {}",
                var.name,
                var.values.len(),
                cells
            )));
        }
    }

    silence_hdf5_errors();
    let mut file = netcdf::create(path)?;

    file.add_dimension("time", 1)?;
    file.add_dimension("lat", tile.lats.len())?;
    file.add_dimension("lon", tile.lons.len())?;

    for (name, value) in &tile.global_attributes {
        file.add_attribute(name, value.to_netcdf())?;
    }

    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("standard_name", "time")?;
        time.put_attribute("long_name", "time")?;
        time.put_attribute("units", TIME_UNITS)?;
        time.put_attribute("calendar", "standard")?;
        time.put_attribute("axis", "T")?;
        time.put_values(&[tile.time], ..)?;
    }
    write_axis(&mut file, "lat", "latitude", "degrees_north", "Y", (-90.0, 90.0), &tile.lats)?;
    write_axis(&mut file, "lon", "longitude", "degrees_east", "X", (-180.0, 180.0), &tile.lons)?;

    for var in &tile.variables {
        let dims = ["time", "lat", "lon"];
        match &var.values {
            DataValues::F32(values) => {
                let mut nc = file.add_variable::<f32>(&var.name, &dims)?;
                if let Some(fill) = var.fill_value {
                    nc.set_fill_value(fill)?;
                }
                nc.set_compression(DEFLATE_LEVEL, true)?;
                for (name, value) in &var.attributes {
                    nc.put_attribute(name, value.to_netcdf())?;
                }
                nc.put_values(values, ..)?;
            }
            DataValues::U8(values) => {
                let mut nc = file.add_variable::<u8>(&var.name, &dims)?;
                nc.set_compression(DEFLATE_LEVEL, true)?;
                for (name, value) in &var.attributes {
                    nc.put_attribute(name, value.to_netcdf())?;
                }
                nc.put_values(values, ..)?;
            }
        }
    }

    debug!(
        path = %path.display(),
        rows = tile.lats.len(),
        cols = tile.lons.len(),
        variables = tile.variables.len(),
        "Wrote tile"
    );
    Ok(())
}

/// `valid` is the axis' geographic domain, not the tile's extent.
fn write_axis(
    file: &mut netcdf::FileMut,
    name: &str,
    standard_name: &str,
    units: &str,
    axis: &str,
    valid: (f64, f64),
    values: &[f64],
) -> NetCdfResult<()> {
    let mut var = file.add_variable::<f64>(name, &[name])?;
    var.put_attribute("standard_name", standard_name)?;
    var.put_attribute("long_name", standard_name)?;
    var.put_attribute("units", units)?;
    var.put_attribute("axis", axis)?;
    var.put_attribute("valid_min", valid.0)?;
    var.put_attribute("valid_max", valid.1)?;
    var.put_values(values, ..)?;
    Ok(())
}

/// Read a tile written by [`write_tile`].
///
/// Data variables carrying `flag_values` are read as bytes, all others as
/// 32-bit floats. Attributes of types the layout never writes are skipped.
pub fn read_tile<P: AsRef<Path>>(path: P) -> NetCdfResult<TileDataset> {
    let path = path.as_ref();
    let file = open_existing(path)?;

    let axis = |name: &str| {
        file.variable(name)
            .ok_or_else(|| NetCdfError::missing(format!("variable '{}' in {}", name, path.display())))
    };
    let lats = read_axis(&axis("lat")?)?;
    let lons = read_axis(&axis("lon")?)?;
    let time = read_axis(&axis("time")?)?
        .first()
        .copied()
        .ok_or_else(|| NetCdfError::missing("time value"))?;

    let global_attributes = file
        .attributes()
        .filter_map(|attr| {
            let value = AttrValue::from_netcdf(attr.value().ok()?)?;
            Some((attr.name().to_string(), value))
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        let name = var.name();
        if matches!(name.as_str(), "time" | "lat" | "lon") {
            continue;
        }
        let values = if has_attr(&var, "flag_values") {
            DataValues::U8(var.get_values::<u8, _>(..)?)
        } else {
            DataValues::F32(var.get_values::<f32, _>(..)?)
        };
        let attributes = var
            .attributes()
            .filter(|attr| attr.name() != "_FillValue")
            .filter_map(|attr| {
                let value = AttrValue::from_netcdf(attr.value().ok()?)?;
                Some((attr.name().to_string(), value))
            })
            .collect();
        variables.push(DataVariable {
            fill_value: get_f32_attr(&var, "_FillValue"),
            name,
            values,
            attributes,
        });
    }

    Ok(TileDataset {
        lats,
        lons,
        time,
        variables,
        global_attributes,
    })
}

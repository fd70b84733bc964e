use crate::Error;
use std::collections::HashMap;
use std::str::FromStr;

/// Opaque texture handle produced by the caller's texture loader.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct TextureHandle(pub u64);

#[derive(Clone, Debug)]
pub struct Atlas {
    pub pages: Vec<AtlasPage>,
    pub regions: Vec<AtlasRegion>,
    region_index: HashMap<String, usize>,
}

impl Atlas {
    /// Parses atlas text without resolving textures.
    pub fn parse(input: &str) -> Result<Self, Error> {
        parse_atlas(input, &mut |_| Ok(None))
    }

    /// Parses atlas text, asking `loader` for a texture handle for every page name.
    pub fn parse_with_loader<F>(input: &str, mut loader: F) -> Result<Self, Error>
    where
        F: FnMut(&str) -> Result<TextureHandle, Error>,
    {
        parse_atlas(input, &mut |name| loader(name).map(Some))
    }

    pub fn find_region(&self, name: &str) -> Option<&AtlasRegion> {
        self.region_index
            .get(name)
            .and_then(|&index| self.regions.get(index))
    }

    pub fn page(&self, index: usize) -> Option<&AtlasPage> {
        self.pages.get(index)
    }
}

impl FromStr for Atlas {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Clone, Debug)]
pub struct AtlasPage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub min_filter: AtlasFilter,
    pub mag_filter: AtlasFilter,
    pub wrap_u: AtlasWrap,
    pub wrap_v: AtlasWrap,
    pub texture: Option<TextureHandle>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AtlasFilter {
    Nearest,
    #[default]
    Linear,
    MipMap,
    MipMapNearestNearest,
    MipMapLinearNearest,
    MipMapNearestLinear,
    MipMapLinearLinear,
}

impl AtlasFilter {
    fn parse(value: &str) -> Result<Self, Error> {
        Ok(match value.to_ascii_lowercase().as_str() {
            "nearest" => AtlasFilter::Nearest,
            "linear" => AtlasFilter::Linear,
            "mipmap" => AtlasFilter::MipMap,
            "mipmapnearestnearest" => AtlasFilter::MipMapNearestNearest,
            "mipmaplinearnearest" => AtlasFilter::MipMapLinearNearest,
            "mipmapnearestlinear" => AtlasFilter::MipMapNearestLinear,
            "mipmaplinearlinear" => AtlasFilter::MipMapLinearLinear,
            _ => {
                return Err(Error::AtlasUnknownFilter {
                    value: value.to_string(),
                });
            }
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AtlasWrap {
    #[default]
    ClampToEdge,
    Repeat,
}

/// UV rectangle plus packing metadata, as consumed by region and mesh attachments.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureRegion {
    pub page: Option<usize>,
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
    pub rotate: bool,
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub original_width: f32,
    pub original_height: f32,
}

impl TextureRegion {
    /// A region covering the whole texture, used when no atlas is available.
    pub fn full(width: f32, height: f32) -> Self {
        Self {
            page: None,
            u: 0.0,
            v: 0.0,
            u2: 1.0,
            v2: 1.0,
            rotate: false,
            width,
            height,
            offset_x: 0.0,
            offset_y: 0.0,
            original_width: width,
            original_height: height,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AtlasRegion {
    pub name: String,
    pub page: usize,
    pub x: i32,
    pub y: i32,
    pub index: i32,
    pub splits: Option<[i32; 4]>,
    pub pads: Option<[i32; 4]>,
    pub region: TextureRegion,
}

struct LineReader<'a> {
    lines: std::str::Lines<'a>,
}

impl<'a> LineReader<'a> {
    fn read_line(&mut self) -> Option<&'a str> {
        self.lines.next()
    }

    fn read_value(&mut self) -> Result<&'a str, Error> {
        let line = self.read_line().ok_or_else(|| Error::AtlasParse {
            message: "unexpected end of atlas".to_string(),
        })?;
        let (_, value) = line.split_once(':').ok_or_else(|| Error::AtlasParse {
            message: format!("invalid line: {line}"),
        })?;
        Ok(value.trim())
    }

    /// Reads up to four comma separated values after the colon.
    fn read_tuple(&mut self) -> Result<Vec<&'a str>, Error> {
        let value = self.read_value()?;
        Ok(value.splitn(4, ',').map(str::trim).collect())
    }
}

fn parse_int(value: Option<&&str>, what: &str) -> Result<i32, Error> {
    value
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(|| Error::AtlasParse {
            message: format!("invalid {what}: {value:?}"),
        })
}

fn parse_quad(tuple: &[&str], what: &str) -> Result<[i32; 4], Error> {
    Ok([
        parse_int(tuple.first(), what)?,
        parse_int(tuple.get(1), what)?,
        parse_int(tuple.get(2), what)?,
        parse_int(tuple.get(3), what)?,
    ])
}

fn parse_atlas(
    input: &str,
    loader: &mut dyn FnMut(&str) -> Result<Option<TextureHandle>, Error>,
) -> Result<Atlas, Error> {
    let mut reader = LineReader {
        lines: input.lines(),
    };
    let mut pages: Vec<AtlasPage> = Vec::new();
    let mut regions: Vec<AtlasRegion> = Vec::new();
    let mut region_index = HashMap::new();
    let mut current_page: Option<usize> = None;

    while let Some(line) = reader.read_line() {
        let line = line.trim();
        if line.is_empty() {
            current_page = None;
            continue;
        }

        let Some(page_index) = current_page else {
            let first = reader.read_tuple()?;
            let (mut width, mut height) = (0, 0);
            // Size is optional for atlases packed with an old TexturePacker. The pixel format
            // line that follows is not needed by the runtime.
            if first.len() == 2 {
                width = parse_int(first.first(), "page width")?.max(0) as u32;
                height = parse_int(first.get(1), "page height")?.max(0) as u32;
                reader.read_tuple()?;
            }
            let filters = reader.read_tuple()?;
            let min_filter = AtlasFilter::parse(filters.first().copied().unwrap_or(""))?;
            let mag_filter = AtlasFilter::parse(filters.get(1).copied().unwrap_or(""))?;
            let (wrap_u, wrap_v) = match reader.read_value()? {
                "x" => (AtlasWrap::Repeat, AtlasWrap::ClampToEdge),
                "y" => (AtlasWrap::ClampToEdge, AtlasWrap::Repeat),
                "xy" => (AtlasWrap::Repeat, AtlasWrap::Repeat),
                _ => (AtlasWrap::ClampToEdge, AtlasWrap::ClampToEdge),
            };
            let texture = loader(line)?;
            pages.push(AtlasPage {
                name: line.to_string(),
                width,
                height,
                min_filter,
                mag_filter,
                wrap_u,
                wrap_v,
                texture,
            });
            current_page = Some(pages.len() - 1);
            continue;
        };

        let page = &pages[page_index];
        let rotate = reader.read_value()? == "true";

        let xy = reader.read_tuple()?;
        let x = parse_int(xy.first(), "region x")?;
        let y = parse_int(xy.get(1), "region y")?;

        let size = reader.read_tuple()?;
        let width = parse_int(size.first(), "region width")?;
        let height = parse_int(size.get(1), "region height")?;

        let page_width = page.width.max(1) as f32;
        let page_height = page.height.max(1) as f32;
        let u = x as f32 / page_width;
        let v = y as f32 / page_height;
        let (u2, v2) = if rotate {
            (
                (x + height) as f32 / page_width,
                (y + width) as f32 / page_height,
            )
        } else {
            (
                (x + width) as f32 / page_width,
                (y + height) as f32 / page_height,
            )
        };

        let mut splits = None;
        let mut pads = None;
        let mut tuple = reader.read_tuple()?;
        // Split is optional; pad is optional but only present with splits.
        if tuple.len() == 4 {
            splits = Some(parse_quad(&tuple, "region split")?);
            tuple = reader.read_tuple()?;
            if tuple.len() == 4 {
                pads = Some(parse_quad(&tuple, "region pad")?);
                tuple = reader.read_tuple()?;
            }
        }
        let original_width = parse_int(tuple.first(), "region orig")?;
        let original_height = parse_int(tuple.get(1), "region orig")?;

        let offset = reader.read_tuple()?;
        let offset_x = parse_int(offset.first(), "region offset")?;
        let offset_y = parse_int(offset.get(1), "region offset")?;

        let index = reader.read_value()?.parse::<i32>().unwrap_or(-1);

        region_index.insert(line.to_string(), regions.len());
        regions.push(AtlasRegion {
            name: line.to_string(),
            page: page_index,
            x,
            y,
            index,
            splits,
            pads,
            region: TextureRegion {
                page: Some(page_index),
                u,
                v,
                u2,
                v2,
                rotate,
                width: width.abs() as f32,
                height: height.abs() as f32,
                offset_x: offset_x as f32,
                offset_y: offset_y as f32,
                original_width: original_width as f32,
                original_height: original_height as f32,
            },
        });
    }

    if pages.is_empty() {
        return Err(Error::AtlasParse {
            message: "empty atlas".to_string(),
        });
    }

    log::debug!(
        "parsed atlas: {} page(s), {} region(s)",
        pages.len(),
        regions.len()
    );

    Ok(Atlas {
        pages,
        regions,
        region_index,
    })
}

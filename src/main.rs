use baker::{
    build_surfaces, write_lightmap_lump, BakeConfig, DoomMap, LightmapBuilder, LIGHTMAP_MAX_SIZE,
};
use clap::{value_t, App, Arg};
use log::info;
use std::path::PathBuf;
use std::process;
use std::result::Result as StdResult;
use wad::Archive;

type Result<T> = StdResult<T, failure::Error>;

struct Config {
    wad_file: PathBuf,
    output: Option<PathBuf>,
    level_index: usize,
    image_directory: Option<PathBuf>,
    list_levels: bool,
    bake: BakeConfig,
}

impl Config {
    fn from_args() -> Result<Config> {
        let matches = App::new("lumen")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Bakes static lightmaps into Doom64-format levels.")
            .arg(
                Arg::with_name("wad")
                    .help("WAD file containing the level to bake")
                    .value_name("FILE")
                    .required(true),
            )
            .arg(
                Arg::with_name("level")
                    .long("level")
                    .short("l")
                    .help("index of the level to bake")
                    .value_name("N")
                    .default_value("0"),
            )
            .arg(
                Arg::with_name("output")
                    .long("output")
                    .short("o")
                    .help("write the patched WAD here instead of in place")
                    .value_name("FILE"),
            )
            .arg(
                Arg::with_name("samples")
                    .long("samples")
                    .short("s")
                    .help("world units covered by one lightmap texel")
                    .value_name("UNITS")
                    .default_value("16"),
            )
            .arg(
                Arg::with_name("size")
                    .long("size")
                    .short("t")
                    .help("edge length of the square atlas textures")
                    .value_name("TEXELS")
                    .default_value("128"),
            )
            .arg(
                Arg::with_name("ambience")
                    .long("ambience")
                    .short("a")
                    .help("base light level added to every texel, 0 to 1")
                    .value_name("LEVEL")
                    .default_value("0"),
            )
            .arg(
                Arg::with_name("images")
                    .long("images")
                    .help("also dump atlas textures as TGA files into DIR")
                    .value_name("DIR"),
            )
            .arg(
                Arg::with_name("list-levels")
                    .long("list-levels")
                    .help("list the levels in the WAD, then exit"),
            )
            .get_matches();

        let size = value_t!(matches, "size", usize)?;
        if size == 0 || size > LIGHTMAP_MAX_SIZE {
            failure::bail!("texture size must be between 1 and {}", LIGHTMAP_MAX_SIZE);
        }
        let samples = value_t!(matches, "samples", usize)?;
        if samples == 0 {
            failure::bail!("sample quantum must be positive");
        }

        Ok(Config {
            wad_file: value_t!(matches, "wad", String)?.into(),
            output: matches.value_of("output").map(PathBuf::from),
            level_index: value_t!(matches, "level", usize)?,
            image_directory: matches.value_of("images").map(PathBuf::from),
            list_levels: matches.is_present("list-levels"),
            bake: BakeConfig {
                texture_width: size,
                texture_height: size,
                samples,
                ambience: value_t!(matches, "ambience", f32)?,
            },
        })
    }
}

fn run() -> Result<()> {
    env_logger::init();
    let config = Config::from_args()?;

    let wad = Archive::open(&config.wad_file)?;
    if config.list_levels {
        for i_level in 0..wad.num_levels() {
            println!("{:3} {:8}", i_level, wad.level_lump(i_level)?.name());
        }
        return Ok(());
    }

    let map = DoomMap::from_archive(&wad, config.level_index)?;
    let mut surfaces = build_surfaces(&map)?;

    let mut builder = LightmapBuilder::new(&config.bake);
    builder.create_lightmaps(&map, &mut surfaces)?;

    if let Some(directory) = &config.image_directory {
        builder.write_textures(directory)?;
    }

    let lump = write_lightmap_lump(&surfaces, &builder);
    let marker = wad.level_lump(config.level_index)?.index();
    let output = config.output.as_ref().unwrap_or(&config.wad_file);
    drop(wad);
    wad::writer::write_patched(&config.wad_file, output, marker, lump)?;

    info!("Done.");
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("lumen: {}", error);
        process::exit(1);
    }
}

#[macro_use]
extern crate log;

use std::{env, fs};
use std::path::{Path, PathBuf};

use custom_error::custom_error;
use env_logger::Env;
use rayon::prelude::*;

use gif_support::{writer::OPTION_MAX_PIXELS, GIFFormatSupportPlugin};
use pixelbox_core::{
    models::{ImageIOError, ImageWriterOptions},
    plugins::{find_plugin, Plugins},
    utils::print_intro,
};
use ppm_support::PPMFormatSupportPlugin;

const DEFAULT_LOGGING_LEVEL: &str = "info";
const DEFAULT_OUTPUT_DIR: &str = ".";

custom_error! {pub ConverterError
    Io {description: String} = "IO error: {description}",
    UnknownFormat {description: String} = "Unknown format: {description}",
    Image {source: ImageIOError} = "{source}",
}

struct ConvertOptions {
    to_format: String,
    output_dir: PathBuf,
    writer_options: ImageWriterOptions,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_LOGGING_LEVEL)).init();
    print_intro();

    let args: Vec<String> = env::args().collect();
    debug!("args are: {:?}", args);

    let sources = argument_values(&args, "source");
    let to_format = match argument_value(&args, "goal-format") {
        Some(v) if !sources.is_empty() => v,
        _ => {
            error!("please specify command:\nconverter --source=example.ppm [--source=other.ppm] --goal-format=gif [--output=dir] [--max-pixels=1000000]");
            return;
        }
    };

    let mut writer_options = ImageWriterOptions::default();
    if let Some(max_pixels) = argument_value(&args, "max-pixels") {
        writer_options = writer_options.with_option(OPTION_MAX_PIXELS, &max_pixels);
    }

    let options = ConvertOptions {
        to_format,
        output_dir: PathBuf::from(argument_value(&args, "output").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())),
        writer_options,
    };

    if let Err(err) = fs::create_dir_all(&options.output_dir) {
        error!("failed to create output directory {}: {}", options.output_dir.to_string_lossy(), err);
        return;
    }

    let plugins = plugins();

    // every source is an independent encode, nothing is shared between them
    let failed = sources.par_iter()
        .map(|source| match convert_file(&plugins, source, &options) {
            Ok(save_to) => {
                info!("Result saved to {}", save_to.to_string_lossy());
                true
            },
            Err(err) => {
                error!("Failed to convert {}: {}", source, err);
                false
            }
        })
        .filter(|converted| !converted)
        .count();

    if failed > 0 {
        error!("{} of {} file(s) failed to convert", failed, sources.len());
        std::process::exit(1);
    }
}

fn plugins() -> Plugins {
    vec![
        Box::new(GIFFormatSupportPlugin::new()),
        Box::new(PPMFormatSupportPlugin::new()),
    ]
}

fn convert_file(plugins: &Plugins, from_file: &str, options: &ConvertOptions) -> Result<PathBuf, ConverterError> {
    info!("Converting file {} to {}", from_file, options.to_format);

    let file = fs::read(from_file).map_err(|err| ConverterError::Io {
        description: format!("failed to read {}: {}", from_file, err),
    })?;

    let extension = match Path::new(from_file).extension() {
        Some(v) => v.to_string_lossy().to_lowercase(),
        None => return Err(ConverterError::UnknownFormat {
            description: format!("failed to detect extension of file {}", from_file),
        }),
    };

    let reader = find_plugin(plugins, &extension)
        .and_then(|v| v.reader())
        .ok_or_else(|| ConverterError::UnknownFormat {
            description: format!("no reader for {}", extension),
        })?;
    let writer = find_plugin(plugins, &options.to_format)
        .and_then(|v| v.writer())
        .ok_or_else(|| ConverterError::UnknownFormat {
            description: format!("no writer for {}", options.to_format),
        })?;

    let image = reader.read(&file)?;
    debug!("read {}x{} image from {}", image.width, image.height, from_file);

    let converted = writer.write(&image, &options.writer_options)?;

    let save_to = output_path(&options.output_dir, from_file, &options.to_format);
    fs::write(&save_to, &converted).map_err(|err| ConverterError::Io {
        description: format!("failed to save {}: {}", save_to.to_string_lossy(), err),
    })?;

    Ok(save_to)
}

fn output_path(output_dir: &Path, from_file: &str, to_format: &str) -> PathBuf {
    let stem = Path::new(from_file).file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "result".to_string());

    output_dir.join(format!("{}.{}", stem, to_format.to_lowercase()))
}

fn argument_values(args: &[String], argument_name: &str) -> Vec<String> {
    let prefix = format!("--{}=", argument_name);

    args.iter()
        .filter(|s| s.starts_with(&prefix))
        .map(|s| s[prefix.len()..].to_string())
        .collect()
}

fn argument_value(args: &[String], argument_name: &str) -> Option<String> {
    argument_values(args, argument_name).into_iter().next()
}

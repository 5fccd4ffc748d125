use std::path::PathBuf;

#[derive(Debug)]
struct CliArgs {
    catalog: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    aria::app::run(&args.catalog)
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut catalog = PathBuf::from("songs-list.json");
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--catalog" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--catalog requires a file path");
                };
                catalog = PathBuf::from(value);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if !other.starts_with('-') => catalog = PathBuf::from(other),
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(CliArgs { catalog })
}

fn print_help() {
    println!("aria");
    println!("  [path]             Catalog JSON file (default songs-list.json)");
    println!("  --catalog <path>   Catalog JSON file");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_songs_list_json() {
        let args = parse_args(Vec::new()).expect("parse");
        assert_eq!(args.catalog, PathBuf::from("songs-list.json"));
    }

    #[test]
    fn accepts_positional_and_flagged_catalog_paths() {
        let args = parse_args(vec![String::from("music.json")]).expect("parse");
        assert_eq!(args.catalog, PathBuf::from("music.json"));

        let args =
            parse_args(vec![String::from("--catalog"), String::from("x.json")]).expect("parse");
        assert_eq!(args.catalog, PathBuf::from("x.json"));
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(parse_args(vec![String::from("--wat")]).is_err());
    }
}

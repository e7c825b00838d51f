use clap::Parser;
use fs_err::File;
use nlprule_index::{
    index::{Index, IndexStore},
    rule::PatternRule,
    rules::{RuleSource, XmlRuleSource},
    searcher::{Searcher, SearcherOptions},
    tokenizer::{tag::Tagger, Tokenizer, TokenizerOptions, Tokenizers},
    IndexOptions, Indexer,
};
use serde::Deserialize;
use std::{error::Error, io::BufReader, path::PathBuf};

#[derive(Parser)]
#[clap(
    version = "1.0",
    author = "Benjamin Minixhofer <bminixhofer@gmail.com>"
)]
struct Opts {
    /// Rule IDs to search for. All rules of the grammar file if empty.
    ids: Vec<String>,
    /// Directory of the index. Created if it does not exist.
    #[clap(long, short)]
    index: PathBuf,
    /// Grammar XML file with the rules.
    #[clap(long, short)]
    rules: PathBuf,
    /// Text file to add to the index before searching.
    #[clap(long, short)]
    text: Option<PathBuf>,
    #[clap(long, short, default_value = "en")]
    lang: String,
    /// Tagger dumps with one `word<TAB>lemma<TAB>tag` entry per line.
    /// Replace the built-in lexicon of the language.
    #[clap(long)]
    dump: Vec<PathBuf>,
    /// JSON file with tokenizer, index and searcher options.
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(long)]
    skip_low_signal: bool,
    /// Print matches as JSON lines.
    #[clap(long)]
    json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    tokenizer: TokenizerOptions,
    index: IndexOptions,
    searcher: SearcherOptions,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let opts = Opts::parse();

    let mut config: Config = match &opts.config {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => Config::default(),
    };
    config.index.skip_low_signal |= opts.skip_low_signal;

    let index = if opts.index.join("index.bin").exists() {
        Index::open_in_dir(&opts.index)?
    } else {
        Index::create_in_dir(&opts.index)?
    };

    if let Some(path) = &opts.text {
        let text = fs_err::read_to_string(path)?;
        let mut tokenizers = Tokenizers::builtin().clone();
        let tagger = match tokenizers.get(&opts.lang) {
            _ if !opts.dump.is_empty() => Some(Tagger::from_dumps(opts.dump.as_slice())?),
            Some(tokenizer) => Some(tokenizer.tagger().clone()),
            None => None,
        };
        if let Some(tagger) = tagger {
            tokenizers.insert(&opts.lang, Tokenizer::new(tagger, config.tokenizer));
        }

        let stats = Indexer::new(tokenizers, config.index).index(&text, &index, &opts.lang)?;

        eprintln!(
            "Indexed {} sentences ({} skipped, {} failed)",
            stats.indexed, stats.skipped, stats.failed
        );
    }

    let source = XmlRuleSource::new(&opts.rules);
    let rules: Vec<PatternRule> = if opts.ids.is_empty() {
        source.rules()?.iter().cloned().collect()
    } else {
        opts.ids
            .iter()
            .map(|id| source.rule_by_id(id))
            .collect::<Result<Vec<_>, _>>()?
    };

    let searcher = Searcher::new(config.searcher);
    let reader = index.reader()?;

    for rule in &rules {
        for sentence in searcher.find_rule_matches(rule, &opts.lang, &reader)? {
            if opts.json {
                println!("{}", serde_json::to_string(&sentence)?);
                continue;
            }

            for m in sentence.matches() {
                println!(
                    "{}\t{}\t{}\t{}",
                    sentence.sentence().id(),
                    rule.id(),
                    m.text(sentence.sentence()),
                    m.message
                );
            }
        }
    }

    Ok(())
}

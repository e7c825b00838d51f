//! A dictionary based part-of-speech tagger and lemmatizer.

use crate::types::WordData;
use crate::utils;
use fnv::FnvHashMap;
use fs_err::File;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Looks up lemma and part-of-speech tags of words in a lexicon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tagger {
    tags: FnvHashMap<String, Vec<WordData>>,
}

impl Tagger {
    /// Loads a tagger from dumps with one `word<TAB>lemma<TAB>tag` entry per line.
    /// Lines starting with `#` are comments.
    pub fn from_dumps<P: AsRef<Path>>(paths: &[P]) -> io::Result<Self> {
        let mut tagger = Tagger::default();

        for path in paths {
            let reader = BufReader::new(File::open(path.as_ref())?);
            tagger.extend_from_reader(reader)?;
        }

        Ok(tagger)
    }

    /// Adds the entries of a dump to this tagger.
    pub fn extend_from_reader<R: BufRead>(&mut self, reader: R) -> io::Result<()> {
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let parts: Vec<_> = line.split('\t').collect();

            match parts.as_slice() {
                [word, lemma, tag] => self.add(word, WordData::new(*lemma, *tag)),
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("line {} of tagger dump must have 3 tab-separated columns", number + 1),
                    ))
                }
            }
        }

        Ok(())
    }

    pub fn add(&mut self, word: &str, data: WordData) {
        let entry = self.tags.entry(word.to_string()).or_insert_with(Vec::new);
        if !entry.contains(&data) {
            entry.push(data);
        }
    }

    /// All readings of a word. Title case and upper case words fall back to their lower case readings.
    pub fn get_tags(&self, word: &str) -> Vec<&WordData> {
        let mut tags: Vec<_> = self.tags.get(word).map(|x| x.iter().collect()).unwrap_or_default();
        let lower = word.to_lowercase();

        if tags.is_empty() && word != lower && (utils::is_title_case(word) || utils::is_uppercase(word)) {
            tags.extend(self.tags.get(&lower).into_iter().flatten());
        }

        tags
    }

    /// The built-in English lexicon. A small set of common words, meant to be extended with dumps.
    pub fn english() -> Self {
        let mut tagger = Tagger::default();
        tagger
            .extend_from_reader(include_str!("./en.dump").as_bytes())
            .expect("built-in lexicon has 3 columns per line");
        tagger
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger() -> Tagger {
        let dump = "# word\tlemma\ttag\nlids\tlid\tNNS\nlid\tlid\tNN\nmoves\tmove\tVBZ\nmoves\tmove\tNNS\n";
        let mut tagger = Tagger::default();
        tagger.extend_from_reader(dump.as_bytes()).unwrap();
        tagger
    }

    #[test]
    fn looks_up_readings() {
        let tagger = tagger();

        assert_eq!(tagger.get_tags("lids"), vec![&WordData::new("lid", "NNS")]);
        assert_eq!(tagger.get_tags("moves").len(), 2);
        assert!(tagger.get_tags("xmb").is_empty());
    }

    #[test]
    fn falls_back_to_lower_case() {
        let tagger = tagger();

        assert_eq!(tagger.get_tags("Lids"), vec![&WordData::new("lid", "NNS")]);
        assert_eq!(tagger.get_tags("LID"), vec![&WordData::new("lid", "NN")]);
    }

    #[test]
    fn english_lexicon_is_built_in() {
        let tagger = Tagger::english();

        assert_eq!(tagger.get_tags("deposits"), vec![&WordData::new("deposit", "NNS")]);
        assert_eq!(tagger.get_tags("To"), vec![&WordData::new("to", "TO")]);
    }

    #[test]
    fn rejects_malformed_dumps() {
        let mut tagger = Tagger::default();
        assert!(tagger.extend_from_reader("lids lid NNS".as_bytes()).is_err());
    }
}

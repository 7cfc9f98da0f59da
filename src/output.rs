use crate::classes::ClassAssignment;
use crate::types::ClassId;
use crate::vocabulary::Vocabulary;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Primary artefact: one `surface\tclass-id 0.000000` line per word in
/// vocabulary-id order. The trailing column is a placeholder for
/// downstream tools that expect a log-probability there.
pub fn write_word_classes<W: Write>(
    writer: &mut W,
    vocabulary: &Vocabulary,
    assignment: &ClassAssignment,
) -> io::Result<()> {
    for word in vocabulary.ids() {
        writeln!(
            writer,
            "{}\t{} 0.000000",
            vocabulary.surface(word),
            assignment.class_of(word)
        )?;
    }
    Ok(())
}

/// Secondary artefact: one `class-id: w1,w2,…` line per class, members in
/// ascending vocabulary-id order. Empty classes keep their line.
pub fn write_class_listing<W: Write>(
    writer: &mut W,
    vocabulary: &Vocabulary,
    assignment: &ClassAssignment,
) -> io::Result<()> {
    for class in 0..assignment.num_classes() as ClassId {
        write!(writer, "{class}: ")?;
        for (ix, &word) in assignment.members(class).iter().enumerate() {
            if ix > 0 {
                write!(writer, ",")?;
            }
            write!(writer, "{}", vocabulary.surface(word))?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn write_word_classes_to_path<P: AsRef<Path>>(
    path: P,
    vocabulary: &Vocabulary,
    assignment: &ClassAssignment,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_word_classes(&mut writer, vocabulary, assignment)?;
    writer.flush()
}

pub fn write_class_listing_to_path<P: AsRef<Path>>(
    path: P,
    vocabulary: &Vocabulary,
    assignment: &ClassAssignment,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_class_listing(&mut writer, vocabulary, assignment)?;
    writer.flush()
}

//! String item bodies shared by `<si>` (shared strings) and `<is>` (inline strings).

use quick_xml::events::Event;
use quick_xml::Reader;

use super::workbook::local_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RichRun {
    /// Raw `<rPr>` element bytes, copied verbatim.
    pub props: Option<Vec<u8>>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TextBody {
    Plain(String),
    Rich(Vec<RichRun>),
}

/// Non-text child of a string item, kept as raw XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Extra {
    pub raw: Vec<u8>,
    /// `<rPh>` phonetic runs index into the base text and are dropped once it changes.
    pub phonetic_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StringItem {
    pub body: TextBody,
    pub extras: Vec<Extra>,
}

impl StringItem {
    pub(crate) fn empty() -> Self {
        Self::plain(String::new())
    }

    pub(crate) fn plain(text: String) -> Self {
        Self {
            body: TextBody::Plain(text),
            extras: Vec::new(),
        }
    }

    /// Displayed text: the concatenation of every run.
    pub(crate) fn text(&self) -> String {
        match &self.body {
            TextBody::Plain(text) => text.clone(),
            TextBody::Rich(runs) => runs.iter().map(|run| run.text.as_str()).collect(),
        }
    }

    /// Apply `rewrite` to the displayed text and return the replacement item, if any.
    ///
    /// Rich items keep their runs when rewriting run by run gives the same text as rewriting
    /// the whole string. Otherwise a token spans runs, and the item collapses into one run
    /// carrying the first run's properties.
    pub(crate) fn rewritten(
        &self,
        rewrite: &mut dyn FnMut(&str) -> Option<String>,
    ) -> Option<StringItem> {
        let whole = rewrite(&self.text())?;
        let body = match &self.body {
            TextBody::Plain(_) => TextBody::Plain(whole),
            TextBody::Rich(runs) => {
                let per_run: Vec<RichRun> = runs
                    .iter()
                    .map(|run| RichRun {
                        props: run.props.clone(),
                        text: rewrite(&run.text).unwrap_or_else(|| run.text.clone()),
                    })
                    .collect();
                let joined: String = per_run.iter().map(|run| run.text.as_str()).collect();
                if joined == whole {
                    TextBody::Rich(per_run)
                } else {
                    log::debug!("placeholder spans rich text runs; collapsing to one run");
                    TextBody::Rich(vec![RichRun {
                        props: runs.first().and_then(|run| run.props.clone()),
                        text: whole,
                    }])
                }
            }
        };
        Some(StringItem {
            body,
            extras: self
                .extras
                .iter()
                .filter(|extra| !extra.phonetic_run)
                .cloned()
                .collect(),
        })
    }

    /// Serialize as `<{prefix}{wrapper}>...</{prefix}{wrapper}>`.
    pub(crate) fn write_xml(&self, out: &mut Vec<u8>, prefix: Option<&str>, wrapper: &str) {
        open_tag(out, prefix, wrapper, "");
        match &self.body {
            TextBody::Plain(text) => write_t(out, prefix, text),
            TextBody::Rich(runs) => {
                for run in runs {
                    open_tag(out, prefix, "r", "");
                    if let Some(props) = &run.props {
                        out.extend_from_slice(props);
                    }
                    write_t(out, prefix, &run.text);
                    close_tag(out, prefix, "r");
                }
            }
        }
        for extra in &self.extras {
            out.extend_from_slice(&extra.raw);
        }
        close_tag(out, prefix, wrapper);
    }
}

fn write_t(out: &mut Vec<u8>, prefix: Option<&str>, text: &str) {
    let attrs = if needs_space_preserve(text) {
        r#" xml:space="preserve""#
    } else {
        ""
    };
    open_tag(out, prefix, "t", attrs);
    out.extend_from_slice(quick_xml::escape::escape(text).as_bytes());
    close_tag(out, prefix, "t");
}

/// `<{prefix}{local}>text</{prefix}{local}>` with `text` escaped.
pub(crate) fn write_text_element(
    out: &mut Vec<u8>,
    prefix: Option<&str>,
    local: &str,
    text: &str,
) {
    open_tag(out, prefix, local, "");
    out.extend_from_slice(quick_xml::escape::escape(text).as_bytes());
    close_tag(out, prefix, local);
}

fn open_tag(out: &mut Vec<u8>, prefix: Option<&str>, local: &str, attrs: &str) {
    out.push(b'<');
    if let Some(prefix) = prefix {
        out.extend_from_slice(prefix.as_bytes());
        out.push(b':');
    }
    out.extend_from_slice(local.as_bytes());
    out.extend_from_slice(attrs.as_bytes());
    out.push(b'>');
}

fn close_tag(out: &mut Vec<u8>, prefix: Option<&str>, local: &str) {
    out.extend_from_slice(b"</");
    if let Some(prefix) = prefix {
        out.extend_from_slice(prefix.as_bytes());
        out.push(b':');
    }
    out.extend_from_slice(local.as_bytes());
    out.push(b'>');
}

fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

/// Namespace prefix of a qualified element name (`x:si` -> `x`).
pub(crate) fn element_prefix(name: &[u8]) -> Option<String> {
    let idx = name.iter().position(|b| *b == b':')?;
    Some(String::from_utf8_lossy(&name[..idx]).into_owned())
}

#[inline]
pub(crate) fn position(reader: &Reader<&[u8]>) -> usize {
    reader.buffer_position() as usize
}

/// Parse the children of a string item. The reader must sit just after the opening
/// `<si>`/`<is>` tag; on return it sits just after the matching end tag.
pub(crate) fn parse_string_item(
    reader: &mut Reader<&[u8]>,
    xml: &[u8],
    wrapper: &[u8],
) -> Result<StringItem, quick_xml::Error> {
    let mut buf = Vec::new();
    let mut runs: Vec<RichRun> = Vec::new();
    let mut saw_rich_run = false;
    let mut extras = Vec::new();

    loop {
        let before = position(reader);
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                let text = read_element_text(reader, b"t")?;
                runs.push(RichRun { props: None, text });
            }
            Event::Empty(e) if e.local_name().as_ref() == b"t" => {
                runs.push(RichRun {
                    props: None,
                    text: String::new(),
                });
            }
            Event::Start(e) if e.local_name().as_ref() == b"r" => {
                saw_rich_run = true;
                runs.push(parse_run(reader, xml)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"r" => {
                saw_rich_run = true;
            }
            Event::Start(e) => {
                let phonetic_run = e.local_name().as_ref() == b"rPh";
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
                extras.push(Extra {
                    raw: xml[before..position(reader)].to_vec(),
                    phonetic_run,
                });
            }
            Event::Empty(e) => {
                extras.push(Extra {
                    raw: xml[before..position(reader)].to_vec(),
                    phonetic_run: e.local_name().as_ref() == b"rPh",
                });
            }
            Event::End(e) if local_name(e.name().as_ref()) == wrapper => break,
            Event::Eof => {
                return Err(quick_xml::Error::Syntax(
                    quick_xml::errors::SyntaxError::UnclosedTag,
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    let body = if saw_rich_run {
        TextBody::Rich(runs)
    } else {
        TextBody::Plain(runs.into_iter().map(|run| run.text).collect())
    };
    Ok(StringItem { body, extras })
}

fn parse_run(reader: &mut Reader<&[u8]>, xml: &[u8]) -> Result<RichRun, quick_xml::Error> {
    let mut buf = Vec::new();
    let mut props = None;
    let mut text = String::new();

    loop {
        let before = position(reader);
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"rPr" => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
                props = Some(xml[before..position(reader)].to_vec());
            }
            Event::Empty(e) if e.local_name().as_ref() == b"rPr" => {
                props = Some(xml[before..position(reader)].to_vec());
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_element_text(reader, b"t")?);
            }
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => {
                return Err(quick_xml::Error::Syntax(
                    quick_xml::errors::SyntaxError::UnclosedTag,
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(RichRun { props, text })
}

/// Concatenated character data up to the end tag with local name `end`.
pub(crate) fn read_element_text(
    reader: &mut Reader<&[u8]>,
    end: &[u8],
) -> Result<String, quick_xml::Error> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == end => break,
            Event::Eof => {
                return Err(quick_xml::Error::Syntax(
                    quick_xml::errors::SyntaxError::UnclosedTag,
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> StringItem {
        let bytes = xml.as_bytes();
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).expect("xml") {
                Event::Start(e) if e.local_name().as_ref() == b"si" => break,
                Event::Eof => panic!("no <si> in {xml}"),
                _ => {}
            }
            buf.clear();
        }
        parse_string_item(&mut reader, bytes, b"si").expect("parse item")
    }

    fn render(item: &StringItem) -> String {
        let mut out = Vec::new();
        item.write_xml(&mut out, None, "si");
        String::from_utf8(out).expect("utf-8")
    }

    fn swap(from: &'static str, to: &'static str) -> impl FnMut(&str) -> Option<String> {
        move |text| text.contains(from).then(|| text.replace(from, to))
    }

    #[test]
    fn plain_item_with_entities() {
        let item = parse(r#"<si><t xml:space="preserve"> A &amp; B </t></si>"#);
        assert_eq!(item.body, TextBody::Plain(" A & B ".to_string()));
        assert_eq!(render(&item), r#"<si><t xml:space="preserve"> A &amp; B </t></si>"#);
    }

    #[test]
    fn rich_runs_keep_properties_when_token_fits_in_one_run() {
        let item = parse(
            r#"<si><r><rPr><b/></rPr><t>Status: </t></r><r><t>##Status_A##</t></r></si>"#,
        );
        let out = item
            .rewritten(&mut swap("##Status_A##", "Done"))
            .expect("changed");
        assert_eq!(
            render(&out),
            r#"<si><r><rPr><b/></rPr><t xml:space="preserve">Status: </t></r><r><t>Done</t></r></si>"#
        );
    }

    #[test]
    fn token_split_across_runs_collapses_to_first_run() {
        let item = parse(r#"<si><r><rPr><i/></rPr><t>##Sta</t></r><r><t>tus##</t></r></si>"#);
        let out = item.rewritten(&mut swap("##Status##", "ok")).expect("changed");
        assert_eq!(
            out.body,
            TextBody::Rich(vec![RichRun {
                props: Some(b"<rPr><i/></rPr>".to_vec()),
                text: "ok".to_string(),
            }])
        );
    }

    #[test]
    fn phonetic_runs_are_not_text_and_are_dropped_on_rewrite() {
        let item = parse(
            r#"<si><t>##Name##</t><rPh sb="0" eb="1"><t>ナ</t></rPh><phoneticPr fontId="1"/></si>"#,
        );
        assert_eq!(item.text(), "##Name##");
        let out = item.rewritten(&mut swap("##Name##", "Tanaka")).expect("changed");
        assert_eq!(
            render(&out),
            r#"<si><t>Tanaka</t><phoneticPr fontId="1"/></si>"#
        );
    }

    #[test]
    fn unchanged_text_yields_none() {
        let item = parse("<si><t>Quarter</t></si>");
        assert_eq!(item.rewritten(&mut |_| None), None);
    }

    #[test]
    fn prefixed_output() {
        let item = StringItem {
            body: TextBody::Plain("a<b".to_string()),
            extras: Vec::new(),
        };
        let mut out = Vec::new();
        item.write_xml(&mut out, Some("x"), "is");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<x:is><x:t>a&lt;b</x:t></x:is>"
        );
    }
}

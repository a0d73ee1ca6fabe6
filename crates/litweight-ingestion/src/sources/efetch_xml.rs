//! efetch XML parsing (`rettype=xml&retmode=xml`).
//!
//! `db=pubmed` answers with a `<PubmedArticleSet>`, `db=pmc` with a JATS
//! `<pmc-articleset>`. A complete set with no articles, or an NCBI error
//! document saying the id is not available, means "no record". Any other
//! body (empty, an HTML gateway page, a document cut off before its root
//! closes) is a `Parse` error so the fetch is retried.

use chrono::NaiveDate;
use litweight_common::{LitweightError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::models::ArticleRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Document {
    Pubmed,
    Pmc,
    Error,
}

/// Elements whose text content is read. Text of their descendants is
/// folded into them, so inline markup does not split a value.
const TEXT_ELEMENTS: &[&str] = &[
    // PubMed
    "PMID", "LastName", "ForeName", "CollectiveName", "Affiliation",
    "Year", "Month", "Day", "MedlineDate", "GrantID", "Agency", "Country", "ArticleId",
    // JATS
    "article-id", "surname", "given-names", "collab", "aff", "year", "award-id", "funding-source",
    // eFetchResult
    "ERROR",
];

/// Attributes that qualify an element: id type, or contributor role.
const KIND_ATTRIBUTES: [&[u8]; 3] = [b"IdType", b"pub-id-type", b"contrib-type"];

struct Frame {
    name: String,
    kind: Option<String>,
    text: String,
    collect: bool,
}

/// Article being assembled, plus the parts of the author, grant and date
/// currently open.
#[derive(Default)]
struct Pending {
    record: ArticleRecord,
    last_name: String,
    fore_name: String,
    collective: String,
    grant_id: String,
    agency: String,
    country: String,
    completed: (Option<i32>, Option<u32>, Option<u32>),
}

impl Pending {
    fn push_author(&mut self) {
        let last = std::mem::take(&mut self.last_name);
        let fore = std::mem::take(&mut self.fore_name);
        let collective = std::mem::take(&mut self.collective);
        let name = match (last.is_empty(), fore.is_empty()) {
            (false, false) => format!("{}, {}", last, fore),
            (false, true) => last,
            _ => collective,
        };
        if !name.is_empty() {
            self.record.authors.push(name);
        }
    }

    fn discard_author(&mut self) {
        self.last_name.clear();
        self.fore_name.clear();
        self.collective.clear();
    }

    fn push_affiliation(&mut self, text: String) {
        if !text.is_empty() {
            self.record.affiliations.push(text);
        }
    }

    fn push_grant(&mut self) {
        let parts: Vec<String> = [
            std::mem::take(&mut self.grant_id),
            std::mem::take(&mut self.agency),
            std::mem::take(&mut self.country),
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
        if !parts.is_empty() {
            self.record.grants.push(parts.join("/"));
        }
    }

    fn completed_date(&self) -> Option<NaiveDate> {
        let (year, month, day) = self.completed;
        NaiveDate::from_ymd_opt(year?, month.unwrap_or(1), day.unwrap_or(1))
    }
}

/// Parse one efetch XML response into its article records.
pub fn parse_efetch_xml(xml: &str) -> Result<Vec<ArticleRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut stack: Vec<Frame> = Vec::new();
    let mut document: Option<Document> = None;
    let mut root_closed = false;
    let mut current: Option<Pending> = None;
    let mut records = Vec::new();
    let mut error_message = String::new();

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            LitweightError::Parse(format!("efetch XML at byte {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(ref e) => {
                let name = element_name(e);
                if stack.is_empty() {
                    if document.is_some() {
                        return Err(LitweightError::Parse(format!(
                            "efetch XML has a second root element <{}>",
                            name
                        )));
                    }
                    document = Some(match name.as_str() {
                        "PubmedArticleSet" => Document::Pubmed,
                        "pmc-articleset" => Document::Pmc,
                        "eFetchResult" => Document::Error,
                        other => {
                            return Err(LitweightError::Parse(format!(
                                "unexpected efetch document <{}>",
                                other
                            )))
                        }
                    });
                } else if stack.len() == 1 && is_article(&name) {
                    current = Some(Pending::default());
                }

                let collect = stack.last().is_some_and(|f| f.collect)
                    || TEXT_ELEMENTS.contains(&name.as_str());
                stack.push(Frame { kind: kind_attribute(e), name, text: String::new(), collect });
            }
            Event::Text(ref e) => {
                if let Some(top) = stack.last_mut().filter(|f| f.collect) {
                    match e.unescape() {
                        Ok(text) => top.text.push_str(&text),
                        Err(_) => top.text.push_str(&String::from_utf8_lossy(e)),
                    }
                }
            }
            Event::CData(ref e) => {
                if let Some(top) = stack.last_mut().filter(|f| f.collect) {
                    top.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(LitweightError::Parse("efetch XML closes an unopened element".to_string()));
                };
                if let Some(parent) = stack.last_mut().filter(|f| f.collect) {
                    if frame.name != "label" {
                        parent.text.push_str(&frame.text);
                    }
                }
                let text = normalise_space(&frame.text);

                if stack.is_empty() {
                    root_closed = true;
                    continue;
                }
                let path: Vec<&str> = stack.iter().map(|f| f.name.as_str()).collect();

                match document {
                    Some(Document::Error) if frame.name == "ERROR" => error_message = text,
                    Some(Document::Pubmed) => {
                        if let Some(pending) = current.as_mut() {
                            pubmed_field(pending, &path, &frame, text);
                        }
                    }
                    Some(Document::Pmc) => {
                        if let Some(pending) = current.as_mut() {
                            pmc_field(pending, &path, &frame, text);
                        }
                    }
                    _ => {}
                }

                if stack.len() == 1 && is_article(&frame.name) {
                    if let Some(pending) = current.take() {
                        records.push(pending.record);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match document {
        None if is_not_available(xml) => Ok(vec![]),
        None => Err(LitweightError::Parse("efetch response holds no XML document".to_string())),
        Some(_) if !root_closed => Err(LitweightError::Parse(
            "efetch response ended before its root element closed".to_string(),
        )),
        Some(Document::Error) if is_not_available(&error_message) => Ok(vec![]),
        Some(Document::Error) => Err(LitweightError::Parse(format!("efetch error: {}", error_message))),
        Some(_) => Ok(records),
    }
}

fn pubmed_field(p: &mut Pending, path: &[&str], frame: &Frame, text: String) {
    let parent = path.last().copied().unwrap_or_default();
    match (parent, frame.name.as_str()) {
        ("MedlineCitation", "PMID") => p.record.pmid = non_empty(text),
        ("Author", "LastName") => p.last_name = text,
        ("Author", "ForeName") => p.fore_name = text,
        ("Author", "CollectiveName") => p.collective = text,
        ("AuthorList", "Author") if path.contains(&"Article") => p.push_author(),
        ("AffiliationInfo", "Affiliation") if path.contains(&"AuthorList") => p.push_affiliation(text),
        ("DateCompleted", "Year") => p.completed.0 = text.parse().ok(),
        ("DateCompleted", "Month") => p.completed.1 = text.parse().ok(),
        ("DateCompleted", "Day") => p.completed.2 = text.parse().ok(),
        ("MedlineCitation", "DateCompleted") => p.record.date_completed = p.completed_date(),
        ("PubDate", "Year") => p.record.published_year = text.parse().ok(),
        ("PubDate", "MedlineDate") => {
            p.record.published_year = text.get(..4).and_then(|y| y.parse().ok());
        }
        ("Grant", "GrantID") => p.grant_id = text,
        ("Grant", "Agency") => p.agency = text,
        ("Grant", "Country") => p.country = text,
        ("GrantList", "Grant") => p.push_grant(),
        ("ArticleIdList", "ArticleId")
            if path.ends_with(&["PubmedData", "ArticleIdList"]) && frame.kind.as_deref() == Some("pmc") =>
        {
            p.record.pmc = non_empty(text);
        }
        _ => {}
    }
}

fn pmc_field(p: &mut Pending, path: &[&str], frame: &Frame, text: String) {
    // Reference lists in <back> carry names and ids of other papers.
    if !path.contains(&"article-meta") {
        return;
    }
    let parent = path.last().copied().unwrap_or_default();
    match (parent, frame.name.as_str()) {
        ("article-meta", "article-id") => match frame.kind.as_deref() {
            Some("pmid") => p.record.pmid = non_empty(text),
            Some("pmc") | Some("pmcid") => p.record.pmc = non_empty(text),
            _ => {}
        },
        ("name", "surname") => p.last_name = text,
        ("name", "given-names") => p.fore_name = text,
        ("contrib", "collab") => p.collective = text,
        ("contrib-group", "contrib") if frame.kind.as_deref() == Some("author") => p.push_author(),
        ("contrib-group", "contrib") => p.discard_author(),
        (_, "aff") => p.push_affiliation(text),
        ("pub-date", "year") if p.record.published_year.is_none() => {
            p.record.published_year = text.parse().ok();
        }
        ("award-group", "award-id") => p.grant_id = text,
        ("award-group", "funding-source") => p.agency = text,
        ("funding-group", "award-group") => p.push_grant(),
        _ => {}
    }
}

fn is_article(name: &str) -> bool {
    name == "PubmedArticle" || name == "article"
}

/// NCBI's wording for an identifier it has no record for.
fn is_not_available(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("not available") || message.contains("no correct ids")
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn kind_attribute(e: &BytesStart) -> Option<String> {
    KIND_ATTRIBUTES.iter().find_map(|key| {
        e.try_get_attribute(*key)
            .ok()
            .flatten()
            .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
    })
}

fn normalise_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

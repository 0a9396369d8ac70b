/// Optional search criteria. Blank fields are skipped.
///
/// Values are passed through verbatim: a value containing Gmail operators
/// (`OR`, `-`, quotes, another `field:`) changes the meaning of the search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    /// Start date, `YYYY/MM/DD`.
    pub after: Option<String>,
    /// End date, `YYYY/MM/DD`.
    pub before: Option<String>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.to_query().is_empty()
    }

    /// `from:.. to:.. subject:.. after:.. before:..`, present fields only.
    pub fn to_query(&self) -> String {
        let fields = [
            ("from", &self.from),
            ("to", &self.to),
            ("subject", &self.subject),
            ("after", &self.after),
            ("before", &self.before),
        ];

        fields
            .iter()
            .filter_map(|(name, value)| {
                let value = value.as_deref()?.trim();
                (!value.is_empty()).then(|| format!("{name}:{value}"))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_where::is_identifier;
use super::types::{Embed, SelectItem};

/// Parser/renderer for the select list, including relational embeds such as
/// `*,job:jobs(title,budget_min),tailor:users!job_applications_tailor_id_fkey(email)`.
pub struct FilterSelect;

impl FilterSelect {
    pub fn parse(input: &str) -> Result<Vec<SelectItem>, FilterError> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Ok(vec![SelectItem::All]);
        }
        Self::parse_list(&compact)
    }

    fn parse_list(s: &str) -> Result<Vec<SelectItem>, FilterError> {
        split_top_level(s)?
            .into_iter()
            .map(Self::parse_item)
            .collect()
    }

    fn parse_item(item: &str) -> Result<SelectItem, FilterError> {
        if item.is_empty() {
            return Err(FilterError::InvalidSelect("empty select item".to_string()));
        }
        if item == "*" {
            return Ok(SelectItem::All);
        }

        let Some(open) = item.find('(') else {
            if !is_identifier(item) {
                return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", item)));
            }
            return Ok(SelectItem::Column(item.to_string()));
        };

        if !item.ends_with(')') {
            return Err(FilterError::InvalidSelect(format!("unbalanced embed: {}", item)));
        }
        let head = &item[..open];
        let inner = &item[open + 1..item.len() - 1];

        let (alias, target) = match head.split_once(':') {
            Some((alias, target)) => (alias, target),
            None => (head, head),
        };
        let (table, hint) = match target.split_once('!') {
            Some((table, hint)) => (table, Some(hint.to_string())),
            None => (target, None),
        };

        for ident in [Some(alias), Some(table), hint.as_deref()].into_iter().flatten() {
            if !is_identifier(ident) {
                return Err(FilterError::InvalidSelect(format!("invalid embed name: {}", ident)));
            }
        }

        Ok(SelectItem::Embed(Embed {
            alias: alias.to_string(),
            table: table.to_string(),
            hint,
            items: if inner.is_empty() { vec![SelectItem::All] } else { Self::parse_list(inner)? },
        }))
    }

    pub fn generate(items: &[SelectItem]) -> String {
        items.iter().map(Self::generate_item).collect::<Vec<_>>().join(",")
    }

    fn generate_item(item: &SelectItem) -> String {
        match item {
            SelectItem::All => "*".to_string(),
            SelectItem::Column(c) => c.clone(),
            SelectItem::Embed(embed) => {
                let target = match &embed.hint {
                    Some(hint) => format!("{}!{}", embed.table, hint),
                    None => embed.table.clone(),
                };
                let head = if embed.alias == embed.table { target } else { format!("{}:{}", embed.alias, target) };
                format!("{}({})", head, Self::generate(&embed.items))
            }
        }
    }

    /// Keep only the selected plain columns of `row`. Embeds are resolved by
    /// the caller, which knows how to reach other collections.
    pub fn project(items: &[SelectItem], row: &Value) -> Value {
        let Some(obj) = row.as_object() else {
            return row.clone();
        };
        if items.iter().any(|i| matches!(i, SelectItem::All)) {
            return row.clone();
        }
        let mut out = Map::new();
        for item in items {
            if let SelectItem::Column(c) = item {
                if let Some(v) = obj.get(c) {
                    out.insert(c.clone(), v.clone());
                }
            }
        }
        Value::Object(out)
    }

    pub fn embeds(items: &[SelectItem]) -> impl Iterator<Item = &Embed> {
        items.iter().filter_map(|i| match i {
            SelectItem::Embed(e) => Some(e),
            _ => None,
        })
    }
}

fn split_top_level(s: &str) -> Result<Vec<&str>, FilterError> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(FilterError::InvalidSelect("unbalanced parentheses".to_string()));
                }
            }
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(FilterError::InvalidSelect("unbalanced parentheses".to_string()));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_embed() {
        let items = FilterSelect::parse(
            "*, job:jobs(title, budget_min), tailor:users!job_applications_tailor_id_fkey(email, profile:user_profiles(*))",
        )
        .unwrap();
        assert_eq!(items.len(), 3);
        let embeds: Vec<_> = FilterSelect::embeds(&items).collect();
        assert_eq!(embeds[0].alias, "job");
        assert_eq!(embeds[0].table, "jobs");
        assert_eq!(embeds[1].hint.as_deref(), Some("job_applications_tailor_id_fkey"));
        assert_eq!(
            FilterSelect::generate(&items),
            "*,job:jobs(title,budget_min),tailor:users!job_applications_tailor_id_fkey(email,profile:user_profiles(*))"
        );
    }

    #[test]
    fn test_rejects_unbalanced() {
        assert!(FilterSelect::parse("*,job:jobs(title").is_err());
        assert!(FilterSelect::parse("title)").is_err());
    }

    #[test]
    fn test_project_columns() {
        let items = FilterSelect::parse("id,title").unwrap();
        let projected = FilterSelect::project(&items, &json!({ "id": "1", "title": "Kurta", "description": "secret" }));
        assert_eq!(projected, json!({ "id": "1", "title": "Kurta" }));
    }
}

use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_select::FilterSelect;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, QueryPairs, SelectItem, WhereNode};
use crate::gateway::Collection;

/// A query against one collection: select list, WHERE tree, ordering and paging.
///
/// The same filter is rendered to REST query pairs by the HTTP gateway and
/// evaluated directly by the in-memory gateway, so both agree on semantics.
#[derive(Debug, Clone)]
pub struct Filter {
    collection: Collection,
    select_items: Vec<SelectItem>,
    where_node: WhereNode,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            select_items: vec![SelectItem::All],
            where_node: WhereNode::And(vec![]),
            order_data: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn from_data(collection: Collection, data: FilterData) -> Result<Self, FilterError> {
        let mut filter = Self::new(collection);
        filter.assign(data)?;
        Ok(filter)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(&select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        Ok(self)
    }

    pub fn select(&mut self, columns: &str) -> Result<&mut Self, FilterError> {
        let items = FilterSelect::parse(columns)?;
        for embed in FilterSelect::embeds(&items) {
            Self::validate_embed_table(embed)?;
        }
        self.select_items = items;
        Ok(self)
    }

    /// Replace the WHERE tree with `conditions`.
    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_node = FilterWhere::parse(&conditions)?;
        Ok(self)
    }

    /// AND another condition document onto the existing WHERE tree.
    pub fn and_where(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        let node = FilterWhere::parse(&conditions)?;
        self.where_node = match std::mem::replace(&mut self.where_node, WhereNode::And(vec![])) {
            WhereNode::And(mut children) => {
                children.push(node);
                WhereNode::And(children)
            }
            other => WhereNode::And(vec![other, node]),
        };
        Ok(self)
    }

    /// Shorthand for `and_where({ column: value })`.
    pub fn eq(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self, FilterError> {
        let mut doc = serde_json::Map::new();
        doc.insert(column.to_string(), value.into());
        self.and_where(Value::Object(doc))
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        let order_info = FilterOrder::validate_and_parse(&order_spec)?;
        self.order_data = order_info;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }

        // Apply max limit from config, when one is installed
        let filter_config = crate::config::config().map(|c| &c.filter);
        let max_limit = filter_config.and_then(|f| f.max_limit).unwrap_or(i32::MAX);
        let applied_limit = if limit > max_limit {
            if filter_config.map(|f| f.debug_logging).unwrap_or(false) {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn select_items(&self) -> &[SelectItem] {
        &self.select_items
    }

    /// Render as REST query pairs: filters, then `select`, `order`, `limit`, `offset`.
    pub fn to_query_pairs(&self) -> QueryPairs {
        let mut pairs = FilterWhere::generate(&self.where_node);
        pairs.push(("select".to_string(), FilterSelect::generate(&self.select_items)));
        if let Some(order) = FilterOrder::generate(&self.order_data) {
            pairs.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }

    /// Filter-only pairs, for scoping PATCH and DELETE.
    pub fn to_where_pairs(&self) -> QueryPairs {
        FilterWhere::generate(&self.where_node)
    }

    pub fn matches(&self, record: &Value) -> bool {
        FilterWhere::matches(&self.where_node, record)
    }

    /// Sort and page already-matched rows in place.
    pub fn apply_order_and_page(&self, rows: &mut Vec<Value>) {
        if !self.order_data.is_empty() {
            rows.sort_by(|a, b| FilterOrder::compare(&self.order_data, a, b));
        }
        let offset = self.offset.unwrap_or(0).max(0) as usize;
        if offset > 0 {
            rows.drain(..offset.min(rows.len()));
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit.max(0) as usize);
        }
    }

    fn validate_embed_table(embed: &super::types::Embed) -> Result<(), FilterError> {
        embed
            .table
            .parse::<Collection>()
            .map_err(|_| FilterError::InvalidTableName(format!("Unknown embedded table: {}", embed.table)))?;
        for nested in FilterSelect::embeds(&embed.items) {
            Self::validate_embed_table(nested)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs_for_job_board() {
        let mut filter = Filter::new(Collection::Jobs);
        filter.eq("status", "open").unwrap();
        filter.and_where(json!({ "location": { "$ilike": "%Pune%" } })).unwrap();
        filter.order(json!("created_at desc")).unwrap();

        assert_eq!(
            filter.to_query_pairs(),
            vec![
                ("status".to_string(), "eq.open".to_string()),
                ("location".to_string(), "ilike.*Pune*".to_string()),
                ("select".to_string(), "*".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_embed_table_rejected() {
        let mut filter = Filter::new(Collection::JobApplications);
        assert!(filter.select("*,job:gigs(title)").is_err());
    }

    #[test]
    fn test_negative_limit_rejected() {
        let mut filter = Filter::new(Collection::Jobs);
        assert!(filter.limit(-1, None).is_err());
        assert!(filter.limit(10, Some(-2)).is_err());
    }

    #[test]
    fn test_order_and_page_in_memory() {
        let mut filter = Filter::new(Collection::Jobs);
        filter.order(json!("budget_max desc")).unwrap();
        filter.limit(2, Some(1)).unwrap();
        let mut rows = vec![
            json!({ "id": "a", "budget_max": "100" }),
            json!({ "id": "b", "budget_max": "300" }),
            json!({ "id": "c", "budget_max": "200" }),
            json!({ "id": "d", "budget_max": "50" }),
        ];
        filter.apply_order_and_page(&mut rows);
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_from_data() {
        let data: FilterData = serde_json::from_value(json!({
            "select": "id,title",
            "where": { "status": "open" },
            "order": "created_at desc",
            "limit": 5
        }))
        .unwrap();
        let filter = Filter::from_data(Collection::Jobs, data).unwrap();
        assert!(filter.matches(&json!({ "status": "open" })));
        assert!(filter.to_query_pairs().contains(&("limit".to_string(), "5".to_string())));
    }
}

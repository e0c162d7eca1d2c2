use crate::category::ItemCategory;
use serde::Serialize;

/// A found item as published by the police lost-and-found service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FoundItem {
    pub atc_id: String,
    /// `fdPrdtNm`
    pub name: Option<String>,
    /// `depPlace`, where the item is kept.
    pub storage_place: Option<String>,
    /// `fdYmd`
    pub found_date: Option<String>,
    /// `fdSbjt`
    pub subject: Option<String>,
    /// `fdSn`
    pub serial: Option<String>,
    /// `prdtClNm`, e.g. "지갑 > 남성용 지갑".
    pub category_name: Option<String>,
    /// `fdFilePathImg`
    pub image_url: Option<String>,
    /// `tel`, only present in detail responses.
    pub phone: Option<String>,
    /// `uniq`, only present in detail responses.
    pub description: Option<String>,
    /// `fdPlace`, only present in detail responses.
    pub found_place: Option<String>,
}

/// A lost item report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LostItem {
    pub atc_id: String,
    /// `lstPrdtNm`
    pub name: Option<String>,
    /// `lstPlace`
    pub lost_place: Option<String>,
    /// `lstYmd`
    pub lost_date: Option<String>,
    /// `lstSbjt`
    pub subject: Option<String>,
    /// `lstSn`
    pub serial: Option<String>,
    /// `prdtClNm`
    pub category_name: Option<String>,
    /// `tel`, only present in detail responses.
    pub phone: Option<String>,
    /// `uniq`, only present in detail responses.
    pub description: Option<String>,
    /// `orgNm`, the station that took the report.
    pub organization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ExternalItem {
    Found(FoundItem),
    Lost(LostItem),
}

impl ExternalItem {
    pub fn atc_id(&self) -> &str {
        match self {
            ExternalItem::Found(item) => &item.atc_id,
            ExternalItem::Lost(item) => &item.atc_id,
        }
    }

    pub fn category(&self) -> ItemCategory {
        match self {
            ExternalItem::Found(_) => ItemCategory::Found,
            ExternalItem::Lost(_) => ItemCategory::Lost,
        }
    }
}

/// One page of a listing response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemsPage {
    pub items: Vec<ExternalItem>,
    pub page_no: u32,
    pub num_of_rows: u32,
    pub total_count: u64,
}

/// Query parameters for a listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub page_no: u32,
    pub num_of_rows: u32,
    /// `PRDT_CL_CD_01`, top level item classification code.
    pub category_code: Option<String>,
    /// `PRDT_CL_CD_02`
    pub subcategory_code: Option<String>,
    /// `N_FD_LCT_CD` for found items, `LST_LCT_CD` for lost items.
    pub location_code: Option<String>,
    /// `START_YMD`, `YYYYMMDD`.
    pub start_date: Option<String>,
    /// `END_YMD`, `YYYYMMDD`.
    pub end_date: Option<String>,
}

impl ItemQuery {
    pub fn page(page_no: u32, num_of_rows: u32) -> Self {
        Self {
            page_no,
            num_of_rows,
            ..Default::default()
        }
    }

    /// Query string parameters, without the service key.
    pub fn to_params(&self, category: ItemCategory) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("pageNo", self.page_no.max(1).to_string()),
            ("numOfRows", self.num_of_rows.max(1).to_string()),
            ("_type", "xml".to_string()),
        ];

        let location_key = match category {
            ItemCategory::Found => "N_FD_LCT_CD",
            ItemCategory::Lost => "LST_LCT_CD",
        };

        let optional = [
            ("PRDT_CL_CD_01", &self.category_code),
            ("PRDT_CL_CD_02", &self.subcategory_code),
            (location_key, &self.location_code),
            ("START_YMD", &self.start_date),
            ("END_YMD", &self.end_date),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((key, value.to_string()));
            }
        }

        params
    }
}

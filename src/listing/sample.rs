//! Built-in listings served when neither the store nor the upstream API has data.

use crate::category::ItemCategory;
use crate::item_store::StoredItemRow;
use chrono::Utc;

struct SampleItem {
    atc_id: &'static str,
    item_name: &'static str,
    place: &'static str,
    date: &'static str,
    content: &'static str,
    storage: &'static str,
    phone: &'static str,
    item_type_a: &'static str,
    item_type_b: &'static str,
}

const FOUND_SAMPLES: &[SampleItem] = &[
    SampleItem {
        atc_id: "SAMPLE-F-001",
        item_name: "검정색 가죽 지갑",
        place: "서울역 유실물센터",
        date: "20240110",
        content: "서울역 대합실에서 습득한 검정색 반지갑입니다.",
        storage: "서울역 유실물센터",
        phone: "02-3149-2500",
        item_type_a: "지갑",
        item_type_b: "남성용 지갑",
    },
    SampleItem {
        atc_id: "SAMPLE-F-002",
        item_name: "아이폰 14",
        place: "강남경찰서",
        date: "20240108",
        content: "강남역 11번 출구 앞에서 습득한 휴대폰입니다.",
        storage: "강남경찰서",
        phone: "02-3447-0112",
        item_type_a: "휴대폰",
        item_type_b: "스마트폰",
    },
    SampleItem {
        atc_id: "SAMPLE-F-003",
        item_name: "파란색 백팩",
        place: "부산역 유실물센터",
        date: "20240105",
        content: "KTX 객실 선반에서 습득한 가방입니다.",
        storage: "부산역 유실물센터",
        phone: "051-440-2516",
        item_type_a: "가방",
        item_type_b: "백팩",
    },
    SampleItem {
        atc_id: "SAMPLE-F-004",
        item_name: "차 열쇠",
        place: "홍대입구역",
        date: "20240103",
        content: "자동차 스마트키 1개.",
        storage: "마포경찰서",
        phone: "02-3142-0112",
        item_type_a: "기타물품",
        item_type_b: "열쇠",
    },
];

const LOST_SAMPLES: &[SampleItem] = &[
    SampleItem {
        atc_id: "SAMPLE-L-001",
        item_name: "갈색 카드지갑",
        place: "지하철 2호선",
        date: "20240111",
        content: "신분증과 교통카드가 들어 있습니다.",
        storage: "종로경찰서",
        phone: "",
        item_type_a: "지갑",
        item_type_b: "카드지갑",
    },
    SampleItem {
        atc_id: "SAMPLE-L-002",
        item_name: "갤럭시 버즈",
        place: "광화문 광장",
        date: "20240109",
        content: "흰색 케이스에 스티커가 붙어 있습니다.",
        storage: "종로경찰서",
        phone: "",
        item_type_a: "전자기기",
        item_type_b: "이어폰",
    },
    SampleItem {
        atc_id: "SAMPLE-L-003",
        item_name: "검정 우산",
        place: "시내버스 472번",
        date: "20240104",
        content: "장우산, 손잡이가 나무입니다.",
        storage: "서초경찰서",
        phone: "",
        item_type_a: "기타물품",
        item_type_b: "우산",
    },
];

/// Sample rows for a category, newest first.
pub fn sample_items(category: ItemCategory) -> Vec<StoredItemRow> {
    let samples = match category {
        ItemCategory::Found => FOUND_SAMPLES,
        ItemCategory::Lost => LOST_SAMPLES,
    };
    let now = Utc::now();
    samples
        .iter()
        .map(|sample| StoredItemRow {
            atc_id: sample.atc_id.to_string(),
            item_name: sample.item_name.to_string(),
            place: sample.place.to_string(),
            date: sample.date.to_string(),
            content: sample.content.to_string(),
            image: String::new(),
            storage: sample.storage.to_string(),
            phone: sample.phone.to_string(),
            mgmt_num: String::new(),
            item_type_a: sample.item_type_a.to_string(),
            item_type_b: sample.item_type_b.to_string(),
            updated_at: now,
        })
        .collect()
}

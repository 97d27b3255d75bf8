//! English field name → Korean label (emoji prefix included).

/// Field label table. Order matters only for readability; lookups are by key.
pub(crate) const FIELD_LABELS: &[(&str, &str)] = &[
    ("createdAt", "📅 생성일"),
    ("updatedAt", "📅 수정일"),
    ("address", "📍 주소"),
    ("buildingName", "🏢 건물명"),
    ("description", "📝 설명"),
    ("name", "📛 이름"),
    ("title", "📛 제목"),
    ("phoneNumber", "📞 전화번호"),
    ("phone", "📞 전화번호"),
    ("email", "📧 이메일"),
    ("managerName", "👤 담당자"),
    ("versionName", "📋 버전명"),
    ("totalAmount", "💰 총액"),
    ("unitPassword", "🔑 세대비밀번호"),
    ("firstFloorPassword", "🗝️ 1층비밀번호"),
    ("memo", "📝 메모"),
    ("note", "📝 메모"),
    ("status", "⚡ 상태"),
    ("type", "🏷️ 유형"),
    ("category", "🏷️ 분류"),
    ("id", "🆔 ID"),
    ("data", "📊 데이터"),
    ("buildingType", "🏢 건물유형"),
    ("date", "📅 등록일"),
    // dataJson attributes
    ("siteNumber", "🔢 현장번호"),
    ("contractAmount", "💰 계약금액"),
    ("contractDate", "📅 계약일"),
    ("supervisorName", "👤 감독관"),
    ("clientName", "👤 고객명"),
    ("clientAddress", "📍 고객주소"),
    ("area", "📐 면적"),
    ("startDate", "📅 시작일"),
    ("endDate", "📅 종료일"),
    ("isCompleted", "✅ 완료여부"),
    ("lastModified", "📅 최종수정"),
];

/// Korean label for a field; unknown fields keep their English name.
pub(crate) fn label(field: &str) -> &str {
    FIELD_LABELS
        .iter()
        .find(|(key, _)| *key == field)
        .map_or(field, |(_, value)| value)
}

/// Fields rendered first in a detail block, in this exact order.
pub(crate) const PRIORITY_FIELDS: &[&str] = &[
    "address",
    "buildingName",
    "description",
    "name",
    "title",
    "managerName",
    "phoneNumber",
    "phone",
    "email",
    "versionName",
    "createdAt",
    "updatedAt",
    "status",
    "type",
    "category",
];

//! Tool definitions and the system prompt, both generated from the city config.

use super::format::{company_nature_label, education_label, experience_label};
use super::names;
use crate::config::CityConfig;
use crate::types::ToolDefinition;
use serde_json::{json, Map, Value};

fn code_table(codes: &[&str], label: impl Fn(Option<&str>) -> Option<&'static str>) -> String {
    codes
        .iter()
        .copied()
        .filter_map(|c| label(Some(c)).map(|l| format!("{}:{}", c, l)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn string_param(description: impl Into<String>) -> Value {
    json!({ "type": "string", "description": description.into() })
}

fn job_filter_properties(city: &CityConfig) -> Map<String, Value> {
    let education = code_table(
        &["-1", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10"],
        |c| Some(education_label(c)),
    );
    let experience = code_table(&["0", "1", "2", "3", "4", "5", "6", "7"], |c| {
        Some(experience_label(c))
    });
    let nature = code_table(&["1", "2", "3", "4", "5"], company_nature_label);

    let mut props = Map::new();
    props.insert(
        "jobTitle".into(),
        string_param("岗位名称关键字，例如：Java开发、产品经理"),
    );
    props.insert(
        "current".into(),
        json!({"type": "integer", "description": "页码，默认为1", "default": 1}),
    );
    props.insert(
        "pageSize".into(),
        json!({"type": "integer", "description": "每页岗位数量，默认为10", "default": 10}),
    );
    props.insert(
        "jobLocationAreaCode".into(),
        string_param(format!("区域代码，{}", city.area_codes_description())),
    );
    props.insert("order".into(), string_param("排序方式，0:推荐, 1:最热, 2:最新发布，默认为0"));
    props.insert("minSalary".into(), string_param("最低薪资，单位：元/月"));
    props.insert("maxSalary".into(), string_param("最高薪资，单位：元/月"));
    props.insert("experience".into(), string_param(format!("经验要求代码，{}", experience)));
    props.insert("education".into(), string_param(format!("学历要求代码，{}", education)));
    props.insert("companyNature".into(), string_param(format!("企业类型代码，{}", nature)));
    props
}

/// The six tools offered to the model, in a fixed order.
pub fn tool_definitions(city: &CityConfig) -> Vec<ToolDefinition> {
    let area_props = job_filter_properties(city);

    let mut location_props = job_filter_properties(city);
    location_props.remove("jobLocationAreaCode");
    location_props.insert("latitude".into(), string_param("纬度，由queryLocation获得"));
    location_props.insert("longitude".into(), string_param("经度，由queryLocation获得"));
    location_props.insert(
        "radius".into(),
        json!({"type": "string", "description": "搜索半径（千米），最大50，建议5-10", "default": "10"}),
    );

    vec![
        ToolDefinition::function(
            names::QUERY_LOCATION,
            format!("查询{}具体地点的经纬度，供按位置查询岗位使用", city.name),
            json!({
                "type": "object",
                "properties": {
                    "keywords": string_param(format!("具体地名，例如：{}", city.landmarks_example()))
                },
                "required": ["keywords"]
            }),
        ),
        ToolDefinition::function(
            names::QUERY_JOBS_BY_AREA,
            format!(
                "按区域查询{}的真实岗位。凡是与岗位、工作、招聘、求职有关的问题都必须调用本工具，不得在未调用的情况下给出任何岗位信息。",
                city.name
            ),
            json!({
                "type": "object",
                "properties": area_props,
                "required": ["jobTitle", "current", "pageSize"]
            }),
        ),
        ToolDefinition::function(
            names::QUERY_JOBS_BY_LOCATION,
            format!(
                "按经纬度和半径查询{}某地附近的真实岗位。需先调用queryLocation获得经纬度，不得在未调用的情况下给出任何岗位信息。",
                city.name
            ),
            json!({
                "type": "object",
                "properties": location_props,
                "required": ["jobTitle", "current", "pageSize", "latitude", "longitude", "radius"]
            }),
        ),
        ToolDefinition::function(
            names::PARSE_PDF,
            "解析PDF文件并提取文本，适用于简历等排版复杂的文档",
            json!({
                "type": "object",
                "properties": { "fileUrl": string_param("PDF文件地址") },
                "required": ["fileUrl"]
            }),
        ),
        ToolDefinition::function(
            names::PARSE_IMAGE,
            "识别图片中的文字，适用于简历截图、证书照片等",
            json!({
                "type": "object",
                "properties": { "imageUrl": string_param("图片地址") },
                "required": ["imageUrl"]
            }),
        ),
        ToolDefinition::function(
            names::QUERY_POLICY,
            format!("咨询{}的就业创业、社保医保、人才引进等政策", city.name),
            json!({
                "type": "object",
                "properties": {
                    "message": string_param(format!("政策问题，例如：{}大学生就业补贴", city.name)),
                    "chatId": string_param("会话ID，多轮对话时传入上次返回值，首次不传"),
                    "conversationId": string_param("流水号，多轮对话时传入上次返回值，首次不传"),
                    "realName": {"type": "boolean", "description": "是否实名咨询，为true时须提供aac001、aac147、aac003", "default": false},
                    "aac001": string_param("个人编号，实名咨询时必填"),
                    "aac147": string_param("身份证号，实名咨询时必填"),
                    "aac003": string_param("姓名，实名咨询时必填")
                },
                "required": ["message"]
            }),
        ),
    ]
}

/// System prompt that frames the assistant and forbids invented listings.
pub fn system_prompt(city: &CityConfig) -> String {
    format!(
        r#"你是{system_name}的智能岗位匹配助手，负责理解用户需求、调用查询能力并如实转达结果。

## 最高原则：岗位信息只能来自查询结果
1. 用户询问岗位、工作、招聘相关内容时，必须先调用 {by_area} 或 {by_location} 获取数据。
2. 未调用岗位查询前，不得输出任何岗位信息：岗位名称、公司名称、薪资范围、工作地点、学历要求、经验要求都不允许出现，也不允许“举例”或“推测”岗位。
3. 岗位的展示由系统自动完成，你只需要给出简短的引导语，不要自行排版岗位数据。
4. 每次都要重新查询，不得复用上一轮对话中的岗位。
5. 查询结果为空时如实告知，并建议用户调整条件。

## 查询规划
1. 先弄清回答问题需要哪些信息，再决定调用顺序；一个查询的输入依赖另一个查询的输出时，先调用前者（如先 {location} 取得经纬度，再按位置查岗位）。
2. 已经拿到足够信息就立即作答，不要重复调用已成功返回的查询。
3. 只有岗位查询返回空结果时才值得换关键词或放宽条件重试。
4. 结果只有成功或失败两种，不要在展示数据之后又说“尚未获取”或“查询失败”。

## 用户上传的内容
1. 用户上传了文件时优先使用其中的信息，从简历中提取技能、经历、学历等求职要素。
2. 图片内容被标注为非简历时，先询问用户上传的目的，不要直接假设用户在找工作。

## 表达要求
1. 语言自然简洁，不提“工具”“API”“函数调用”等技术词汇；调用前可以用一句话告诉用户你要做什么。
2. 常规咨询（如面试技巧）无需查询，直接回答即可。
3. 政策咨询支持多轮对话：首次调用不传会话标识，之后沿用上次返回的 chatId 和 conversationId。

## {city}本地信息
- 区域代码：{area_codes}
- 常见简称：{abbreviations}，调用查询时请使用完整名称。"#,
        system_name = city.system_name,
        city = city.name,
        by_area = names::QUERY_JOBS_BY_AREA,
        by_location = names::QUERY_JOBS_BY_LOCATION,
        location = names::QUERY_LOCATION,
        area_codes = city.area_codes_description(),
        abbreviations = city.abbreviations_description(),
    )
}

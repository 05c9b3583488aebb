//! Keyword classification of user text: job intent and resume content.

use super::filters::{ContentFilter, KeywordFilter};
use crate::types::{Message, MessageRole};

/// Label the resolver puts in front of OCR text that does not look like a resume.
pub const NON_RESUME_IMAGE_HINT: &str = "[用户上传的图片内容（非简历格式）]";

/// Keyword matches needed to treat OCR text as a resume.
pub const RESUME_KEYWORD_THRESHOLD: usize = 3;

const JOB_INTENT_KEYWORDS: &[&str] = &[
    "岗位", "工作", "招聘", "职位", "就业", "求职", "找工作", "应聘",
    "薪资", "薪酬", "工资", "待遇", "月薪", "年薪",
    "推荐岗位", "推荐工作", "推荐职位",
    "附近的工作", "附近的岗位", "附近招聘",
    "适合我的", "匹配的岗位", "匹配的工作",
    "开发工程师", "产品经理", "设计师", "运营", "销售", "会计", "财务",
    "前端", "后端", "全栈", "Java", "Python", "测试", "运维",
    "job", "position", "hiring", "vacanc", "salary",
];

const RESUME_KEYWORDS: &[&str] = &[
    // personal details
    "姓名", "性别", "年龄", "出生", "籍贯", "民族", "身份证",
    "电话", "手机", "邮箱", "邮件", "地址", "住址",
    // education
    "学历", "学位", "毕业", "本科", "硕士", "博士", "大专", "高中",
    "专业", "院校", "大学", "学院", "在读", "应届",
    // work history
    "工作经验", "工作经历", "任职", "就职", "离职", "在职",
    "公司", "企业", "单位", "部门", "岗位", "职位", "职务",
    // skills
    "技能", "特长", "证书", "资格", "熟练", "精通", "掌握",
    // self assessment
    "自我评价", "个人简介", "自我介绍", "个人总结", "求职意向",
    "简历", "履历", "个人资料", "基本信息", "联系方式",
];

#[derive(Debug, Clone)]
pub struct IntentClassifier {
    job_keywords: KeywordFilter,
    resume_keywords: KeywordFilter,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self {
            job_keywords: KeywordFilter::from_keywords(JOB_INTENT_KEYWORDS.iter().copied(), Some("job_intent")),
            resume_keywords: KeywordFilter::from_keywords(RESUME_KEYWORDS.iter().copied(), Some("resume")),
        }
    }

    /// Looks at the last user message with plain-text content.
    ///
    /// Text that carries the non-resume image hint never counts: the model must
    /// first ask what the image is for.
    pub fn has_job_intent(&self, messages: &[Message]) -> bool {
        let Some(text) = messages
            .iter()
            .rev()
            .filter(|m| m.role == MessageRole::User)
            .find_map(|m| m.text())
        else {
            return false;
        };

        if text.contains(NON_RESUME_IMAGE_HINT) {
            tracing::debug!("non-resume image in last user message; job intent not assumed");
            return false;
        }

        match self.job_keywords.first_match(text) {
            Some(keyword) => {
                tracing::debug!(keyword, "job intent detected");
                true
            }
            None => false,
        }
    }

    pub fn is_resume(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let hits = self.resume_keywords.count_matches(text);
        tracing::debug!(hits, threshold = RESUME_KEYWORD_THRESHOLD, "resume keyword check");
        hits >= RESUME_KEYWORD_THRESHOLD
    }
}

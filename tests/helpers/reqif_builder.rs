// ==========================================
// ReqIF 测试文档构建器
// ==========================================
// 生成最小可用的 ReqIF XML 与 .reqifz 容器
// 属性定义: ReqIF.Text(XHTML) / ReqIF.ForeignID / ReqIF-WF.SupplierStatus /
//           ReqIF-WF.SupplierComment / Priority(INTEGER)
// ==========================================

use std::io::{Cursor, Write};
use zip::write::{FileOptions, ZipWriter};

/// 单条 SPEC-OBJECT 描述
#[derive(Debug, Clone, Default)]
pub struct SpecObject {
    pub identifier: Option<String>,
    pub foreign_id: Option<String>,
    pub text: Option<String>,
    pub status: Option<String>,
    pub comment: Option<String>,
    pub priority: Option<i64>,
}

impl SpecObject {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn foreign_id(mut self, foreign_id: &str) -> Self {
        self.foreign_id = Some(foreign_id.to_string());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    fn to_xml(&self) -> String {
        let mut values = String::new();
        if let Some(text) = &self.text {
            values.push_str(&format!(
                r#"
        <ATTRIBUTE-VALUE-XHTML>
          <DEFINITION><ATTRIBUTE-DEFINITION-XHTML-REF>AD-TEXT</ATTRIBUTE-DEFINITION-XHTML-REF></DEFINITION>
          <THE-VALUE><xhtml:div>{}</xhtml:div></THE-VALUE>
        </ATTRIBUTE-VALUE-XHTML>"#,
                escape(text)
            ));
        }
        for (definition, value) in [
            ("AD-FID", &self.foreign_id),
            ("AD-STATUS", &self.status),
            ("AD-COMMENT", &self.comment),
        ] {
            if let Some(value) = value {
                values.push_str(&format!(
                    r#"
        <ATTRIBUTE-VALUE-STRING THE-VALUE="{}">
          <DEFINITION><ATTRIBUTE-DEFINITION-STRING-REF>{}</ATTRIBUTE-DEFINITION-STRING-REF></DEFINITION>
        </ATTRIBUTE-VALUE-STRING>"#,
                    escape(value),
                    definition
                ));
            }
        }
        if let Some(priority) = self.priority {
            values.push_str(&format!(
                r#"
        <ATTRIBUTE-VALUE-INTEGER THE-VALUE="{}">
          <DEFINITION><ATTRIBUTE-DEFINITION-INTEGER-REF>AD-PRIO</ATTRIBUTE-DEFINITION-INTEGER-REF></DEFINITION>
        </ATTRIBUTE-VALUE-INTEGER>"#,
                priority
            ));
        }

        let identifier = self
            .identifier
            .as_ref()
            .map(|id| format!(r#" IDENTIFIER="{}""#, escape(id)))
            .unwrap_or_default();

        format!(
            r#"
      <SPEC-OBJECT{identifier}>
        <TYPE><SPEC-OBJECT-TYPE-REF>T-REQ</SPEC-OBJECT-TYPE-REF></TYPE>
        <VALUES>{values}
        </VALUES>
      </SPEC-OBJECT>"#
        )
    }
}

/// ReqIF 文档构建器
#[derive(Debug, Clone, Default)]
pub struct ReqifBuilder {
    objects: Vec<SpecObject>,
}

impl ReqifBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, object: SpecObject) -> Self {
        self.objects.push(object);
        self
    }

    /// 主需求: 标识 + 正文
    pub fn requirement(self, identifier: &str, text: &str) -> Self {
        self.object(SpecObject::new(identifier).text(text))
    }

    /// 供应商反馈: 标识 + 原始状态
    pub fn feedback(self, identifier: &str, status: &str) -> Self {
        self.object(SpecObject::new(identifier).status(status))
    }

    pub fn build(&self) -> String {
        let objects: String = self.objects.iter().map(SpecObject::to_xml).collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<REQ-IF xmlns="http://www.omg.org/spec/ReqIF/20110401/reqif.xsd"
        xmlns:xhtml="http://www.w3.org/1999/xhtml">
  <THE-HEADER>
    <REQ-IF-HEADER IDENTIFIER="H1">
      <REQ-IF-VERSION>1.0</REQ-IF-VERSION>
    </REQ-IF-HEADER>
  </THE-HEADER>
  <CORE-CONTENT>
    <REQ-IF-CONTENT>
      <SPEC-TYPES>
        <SPEC-OBJECT-TYPE IDENTIFIER="T-REQ" LONG-NAME="Requirement">
          <SPEC-ATTRIBUTES>
            <ATTRIBUTE-DEFINITION-XHTML IDENTIFIER="AD-TEXT" LONG-NAME="ReqIF.Text"/>
            <ATTRIBUTE-DEFINITION-STRING IDENTIFIER="AD-FID" LONG-NAME="ReqIF.ForeignID"/>
            <ATTRIBUTE-DEFINITION-STRING IDENTIFIER="AD-STATUS" LONG-NAME="ReqIF-WF.SupplierStatus"/>
            <ATTRIBUTE-DEFINITION-STRING IDENTIFIER="AD-COMMENT" LONG-NAME="ReqIF-WF.SupplierComment"/>
            <ATTRIBUTE-DEFINITION-INTEGER IDENTIFIER="AD-PRIO" LONG-NAME="Priority"/>
          </SPEC-ATTRIBUTES>
        </SPEC-OBJECT-TYPE>
      </SPEC-TYPES>
      <SPEC-OBJECTS>{objects}
      </SPEC-OBJECTS>
    </REQ-IF-CONTENT>
  </CORE-CONTENT>
</REQ-IF>"#
        )
    }
}

/// 打包为 .reqifz 容器（按给定顺序写入条目）
pub fn zip_container(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options: FileOptions<()> = FileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).expect("zip entry");
            zip.write_all(content.as_bytes()).expect("zip write");
        }
        zip.finish().expect("zip finish");
    }
    cursor.into_inner()
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

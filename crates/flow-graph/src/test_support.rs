//! Shared schema fixture for tests

use frank_doc::SchemaIndex;

const FRANKDOC: &str = r#"{
    "metadata": { "version": "9.2.0-test" },
    "elements": {
        "org.frankframework.pipes.AbstractPipe": {
            "name": "AbstractPipe",
            "abstract": true,
            "attributes": {
                "getInputFromSessionKey": { "description": "Session key to read the input from" }
            },
            "forwards": {
                "exception": { "description": "Raised on unhandled errors" }
            }
        },
        "org.frankframework.pipes.EchoPipe": {
            "name": "EchoPipe",
            "parent": "org.frankframework.pipes.AbstractPipe",
            "description": "Returns the input unchanged",
            "attributes": {
                "charset": { "default": "UTF-8" }
            },
            "forwards": {
                "success": {}
            }
        },
        "org.frankframework.pipes.XmlValidator": {
            "name": "XmlValidator",
            "parent": "org.frankframework.pipes.AbstractPipe",
            "attributes": {
                "schema": {},
                "throwException": { "type": "bool", "default": "false" }
            },
            "forwards": {
                "success": {},
                "failure": {}
            }
        },
        "org.frankframework.http.HttpSender": {
            "name": "HttpSender",
            "attributes": {
                "url": { "mandatory": true },
                "method": { "enum": "org.frankframework.http.HttpMethod" }
            },
            "forwards": {
                "*": {},
                "timeout": {}
            }
        },
        "org.frankframework.receivers.Receiver": {
            "name": "Receiver",
            "children": [
                { "multiple": false, "roleName": "listener" }
            ]
        },
        "org.frankframework.receivers.JavaListener": {
            "name": "JavaListener",
            "attributes": {
                "serviceName": {}
            }
        },
        "org.frankframework.core.Exit": {
            "name": "Exit",
            "attributes": {
                "state": { "enum": "org.frankframework.core.ExitState" },
                "code": { "type": "int" }
            }
        }
    },
    "elementNames": {
        "EchoPipe": {
            "labels": { "Components": "Pipes" },
            "className": "org.frankframework.pipes.EchoPipe"
        },
        "XmlValidator": {
            "labels": { "Components": "Pipes" },
            "className": "org.frankframework.pipes.XmlValidator"
        },
        "HttpSender": {
            "labels": { "Components": "Senders" },
            "className": "org.frankframework.http.HttpSender"
        },
        "Receiver": {
            "labels": { "Components": "Receivers" },
            "className": "org.frankframework.receivers.Receiver"
        },
        "JavaListener": {
            "labels": { "Components": "Listeners" },
            "className": "org.frankframework.receivers.JavaListener"
        },
        "Exit": {
            "labels": {},
            "className": "org.frankframework.core.Exit"
        }
    },
    "enums": {
        "org.frankframework.http.HttpMethod": {
            "GET": {},
            "POST": { "description": "Request with a body" }
        },
        "org.frankframework.core.ExitState": {
            "success": {},
            "error": {}
        }
    },
    "labels": {
        "Components": ["Pipes", "Senders", "Listeners", "Receivers"]
    }
}"#;

pub(crate) fn schema() -> SchemaIndex {
    SchemaIndex::build(FRANKDOC).unwrap()
}

/// Same schema except HttpSender no longer declares the timeout forward,
/// for tests that swap the schema under a live graph.
pub(crate) fn schema_without_timeout_forward() -> SchemaIndex {
    let mut doc: serde_json::Value = serde_json::from_str(FRANKDOC).unwrap();
    doc["elements"]["org.frankframework.http.HttpSender"]["forwards"]
        .as_object_mut()
        .unwrap()
        .remove("timeout");
    SchemaIndex::build(&doc.to_string()).unwrap()
}

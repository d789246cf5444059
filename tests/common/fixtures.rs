/// Agent configuration as shipped by the macOS Wazuh package, trimmed
pub const AGENT_CONF: &str = r#"<!--
  Wazuh - Agent - Default configuration for darwin 23.4
  More info at: https://documentation.wazuh.com
-->

<ossec_config>
  <client>
    <server>
      <address>10.0.0.5</address>
      <port>1514</port>
      <protocol>tcp</protocol>
    </server>
    <config-profile>darwin, darwin23</config-profile>
    <notify_time>10</notify_time>
    <time-reconnect>60</time-reconnect>
    <auto_restart>yes</auto_restart>
  </client>

  <client_buffer>
    <disabled>no</disabled>
    <queue_size>5000</queue_size>
    <events_per_second>500</events_per_second>
  </client_buffer>

  <localfile>
    <log_format>macos</log_format>
    <location>macos</location>
  </localfile>

  <active-response>
    <disabled>no</disabled>
    <ca_store>etc/wpk_root.pem</ca_store>
  </active-response>
</ossec_config>
"#;

pub const EXPECTED_RULES: &str = "block all
pass in inet proto tcp from 10.0.0.5 to any port 1514
pass out inet proto tcp from any to 10.0.0.5 port 1514
";

pub const ISOLATED_LABEL_PREFIX: &str = r#"<label key="isolated.time">"#;

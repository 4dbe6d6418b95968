//! The single-page status dashboard.

pub(crate) const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>promptc // dashboard</title>
    <style>
        :root { --bg: #0a0a0b; --panel: #0f0f11; --line: #222; --green: #00ff41; --text: #e0e0e0; --orange: #ff9f1c; --blue: #00d4ff; --red: #ff4d4d; }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body { background: var(--bg); color: var(--text); font-family: 'Inter', 'Segoe UI', sans-serif; height: 100vh; display: flex; flex-direction: column; overflow: hidden; }
        .top-bar { padding: 15px 25px; border-bottom: 1px solid var(--line); display: flex; align-items: center; justify-content: space-between; background: var(--panel); }
        .logo { font-family: monospace; font-weight: bold; font-size: 1.2rem; color: var(--green); letter-spacing: 2px; }
        .mode-badge { padding: 4px 12px; border-radius: 4px; font-size: 0.7rem; font-weight: bold; text-transform: uppercase; letter-spacing: 1px; background: #333; }
        .community { background: var(--blue); color: #000; }
        .enterprise { background: var(--green); color: #000; }
        .metrics-grid { display: grid; grid-template-columns: repeat(6, 1fr); gap: 1px; background: var(--line); border-bottom: 1px solid var(--line); flex-shrink: 0; }
        .metric-item { background: var(--panel); padding: 15px 20px; }
        .metric-label { font-size: 0.6rem; color: #666; text-transform: uppercase; letter-spacing: 1px; margin-bottom: 5px; }
        .metric-val { font-size: 1.1rem; font-family: monospace; font-weight: 600; }
        .main { display: grid; grid-template-columns: 1fr 450px; flex-grow: 1; overflow: hidden; gap: 1px; background: var(--line); }
        .log-section { background: var(--bg); display: flex; flex-direction: column; overflow: hidden; }
        .section-header { padding: 10px 20px; background: var(--panel); font-size: 0.7rem; color: #555; border-bottom: 1px solid var(--line); display: flex; justify-content: space-between; flex-shrink: 0; }
        #logs { flex-grow: 1; overflow-y: auto; padding: 20px; font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.75rem; line-height: 1.6; color: #888; white-space: pre; }
        .entry-kernel { color: var(--green); }
        .entry-protocol { color: var(--blue); }
        .entry-inference { color: var(--orange); }
        .entry-fail { color: var(--red); }
        .side-panel { background: var(--panel); display: flex; flex-direction: column; gap: 1px; overflow: hidden; }
        .ranking { padding: 12px 20px; font-family: monospace; font-size: 0.75rem; color: #888; max-height: 160px; overflow-y: auto; }
        .editor-container { flex-grow: 1; display: flex; flex-direction: column; background: var(--bg); overflow: hidden; }
        textarea { flex-grow: 1; background: var(--bg); color: var(--green); border: none; padding: 20px; font-family: monospace; outline: none; font-size: 0.8rem; resize: none; border-bottom: 1px solid var(--line); }
        .btn-save { padding: 15px; background: var(--green); color: #000; border: none; font-weight: bold; cursor: pointer; text-transform: uppercase; letter-spacing: 1px; flex-shrink: 0; }
        .btn-save:hover { background: #00cc33; }
        #save-status { padding: 8px 20px; font-size: 0.7rem; color: #666; min-height: 1.6rem; }
        ::-webkit-scrollbar { width: 6px; }
        ::-webkit-scrollbar-thumb { background: #333; border-radius: 3px; }
    </style>
</head>
<body>
    <div class="top-bar">
        <div class="logo">PROMPTC</div>
        <div id="mode-badge" class="mode-badge">LOADING...</div>
    </div>
    <div class="metrics-grid">
        <div class="metric-item"><div class="metric-label">Requests</div><div class="metric-val" id="m-inf">0</div></div>
        <div class="metric-item"><div class="metric-label">Success ratio</div><div class="metric-val" id="m-ratio">0 %</div></div>
        <div class="metric-item"><div class="metric-label">Avg latency</div><div class="metric-val" id="m-lat">0 ms</div></div>
        <div class="metric-item"><div class="metric-label">Tokens / s</div><div class="metric-val" id="m-tps">0</div></div>
        <div class="metric-item"><div class="metric-label">Cloud calls</div><div class="metric-val" id="m-cloud">0</div></div>
        <div class="metric-item"><div class="metric-label">Local node</div><div class="metric-val" id="m-node">--</div></div>
    </div>
    <div class="main">
        <div class="log-section">
            <div class="section-header"><span>AUDIT LOG STREAM</span><span id="uptime">UPTIME: --</span></div>
            <div id="logs"></div>
        </div>
        <div class="side-panel">
            <div class="section-header">TEMPLATE RANKING</div>
            <div class="ranking" id="ranking">no template calls yet</div>
            <div class="editor-container">
                <div class="section-header">TEMPLATES (HOT-RELOAD)</div>
                <textarea id="ed" placeholder="Loading templates..."></textarea>
                <button class="btn-save" onclick="save()">Apply changes</button>
                <div id="save-status"></div>
            </div>
        </div>
    </div>
    <script>
        const logs = document.getElementById('logs');
        function connect() {
            const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
            const ws = new WebSocket(scheme + location.host + '/ws');
            ws.onmessage = (e) => {
                const div = document.createElement('div');
                const txt = e.data;
                if (txt.includes('result=FAIL')) div.className = 'entry-fail';
                else if (txt.includes('KERNEL')) div.className = 'entry-kernel';
                else if (txt.includes('PROTOCOL')) div.className = 'entry-protocol';
                else if (txt.includes('INFERENCE')) div.className = 'entry-inference';
                div.textContent = txt;
                logs.appendChild(div);
                while (logs.childNodes.length > 2000) logs.removeChild(logs.firstChild);
                logs.scrollTop = logs.scrollHeight;
            };
            ws.onclose = () => setTimeout(connect, 3000);
        }
        connect();

        function update() {
            fetch('/api/metrics').then(r => r.json()).then(d => {
                document.getElementById('m-inf').textContent = d.inference_count || 0;
                document.getElementById('m-ratio').textContent = (d.success_ratio || 0).toFixed(1) + ' %';
                document.getElementById('m-lat').textContent = Math.round(d.avg_latency_ms || 0) + ' ms';
                document.getElementById('m-tps').textContent = (d.token_throughput || 0).toFixed(1);
                document.getElementById('m-cloud').textContent = d.cloud_calls || 0;

                const node = document.getElementById('m-node');
                node.textContent = d.node_online ? 'ONLINE' : 'CLOUD ONLY';
                node.style.color = d.node_online ? '#00ff41' : '#00d4ff';
                node.title = d.last_heartbeat ? 'last heartbeat ' + d.last_heartbeat : 'never seen';

                const badge = document.getElementById('mode-badge');
                if (d.mode) {
                    badge.textContent = d.mode;
                    badge.className = 'mode-badge ' + d.mode.toLowerCase();
                }

                const ranking = document.getElementById('ranking');
                const rows = (d.template_ranking || []).map(t => t.name + '  ' + t.calls);
                ranking.textContent = rows.length ? rows.join('\n') : 'no template calls yet';
                ranking.style.whiteSpace = 'pre';

                if (d.uptime_since) {
                    const diffMs = new Date() - new Date(d.uptime_since);
                    const hrs = Math.floor(diffMs / 3600000);
                    const mins = Math.floor((diffMs % 3600000) / 60000);
                    document.getElementById('uptime').textContent = 'UPTIME: ' + hrs + 'h ' + mins + 'm';
                }
            }).catch(e => console.error(e));
        }
        setInterval(update, 2000);
        update();

        fetch('/api/config').then(r => r.json()).then(d => document.getElementById('ed').value = JSON.stringify(d, null, 2));
        function save() {
            const status = document.getElementById('save-status');
            fetch('/api/config', { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: document.getElementById('ed').value })
                .then(r => r.json().then(body => ({ ok: r.ok, body })))
                .then(({ ok, body }) => {
                    if (!ok) status.textContent = 'Rejected: ' + body.error;
                    else if (!body.persisted) status.textContent = body.templates + ' templates live, but not saved to disk';
                    else status.textContent = body.templates + ' templates reloaded';
                })
                .catch(e => status.textContent = 'Error: ' + e);
        }
    </script>
</body>
</html>
"#;

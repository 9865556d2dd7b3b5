//! `runtime.js` - helper module shared by every generated stub

/// Source of `runtime.js`.
///
/// `callTool` and `workspace` delegate to the globals the sandbox installs
/// and fail loudly when run outside it; `listTools`/`searchTools` only need
/// the generated `manifest.js`.
pub const RUNTIME_JS: &str = r#"// Generated by forge codegen. Do not edit.
// forge-runtime v1
import manifest from "./manifest.js";

function boundCallTool() {
  const primitive = globalThis.callTool;
  if (typeof primitive !== "function") {
    throw new Error("callTool is not bound in this context; run stubs inside the forge sandbox");
  }
  return primitive;
}

function boundFs() {
  const fs = globalThis.fs;
  if (fs === undefined || fs === null) {
    throw new Error("fs capability is not bound in this context; run stubs inside the forge sandbox");
  }
  return fs;
}

export async function callTool(qualifiedName, input = {}) {
  return boundCallTool()(qualifiedName, input);
}

export function listTools(server) {
  const groups = server === undefined ? manifest : manifest.filter((g) => g.server === server);
  return groups.flatMap((g) =>
    g.tools.map((t) => ({ server: g.server, name: t.name, qualifiedName: t.qualifiedName, description: t.description })),
  );
}

export function searchTools(query, limit = 10) {
  const q = String(query ?? "").trim().toLowerCase();
  if (q === "") return [];
  const tokens = q.split(/\s+/);
  const scored = [];
  for (const tool of listTools()) {
    const name = tool.name.toLowerCase();
    const qualified = tool.qualifiedName.toLowerCase();
    const server = tool.server.toLowerCase();
    const description = (tool.description ?? "").toLowerCase();
    let score = 0;
    if (name === q || qualified === q) score += 100;
    else if (name.includes(q)) score += 50;
    for (const token of tokens) {
      if (name.includes(token)) score += 10;
      if (server.includes(token)) score += 5;
      if (description.includes(token)) score += 3;
    }
    if (score > 0) scored.push({ score, tool });
  }
  scored.sort((a, b) => b.score - a.score);
  return scored.slice(0, limit).map((s) => s.tool);
}

export const workspace = Object.freeze({
  readFile: (path) => boundFs().readFile(path),
  writeFile: (path, content) => boundFs().writeFile(path, content),
  listDir: (path = ".") => boundFs().listDir(path),
  exists: (path) => boundFs().exists(path),
});
"#;
